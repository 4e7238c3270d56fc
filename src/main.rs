// ==========================================
// 계란 로트 매칭 - 命令行入口
// ==========================================
// 每个子命令: 打开订单 → 执行一次编辑 → 保存草稿
// 日志写 stderr, 结果写 stdout
// ==========================================

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use egg_lot_matching::api::{ApiError, MatchingSession};
use egg_lot_matching::app::{get_default_db_path, AppState};
use egg_lot_matching::domain::EggLot;
use egg_lot_matching::engine::WorkOrderRequest;
use egg_lot_matching::i18n::{t, t_with_args};
use egg_lot_matching::logging::{self, LogFormat};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "egg-matching", about = "계란 로트 매칭 / 작업지시", version)]
struct Cli {
    /// 本地数据库路径（默认: 用户数据目录）
    #[arg(long, global = true, env = "EGG_MATCHING_DB_PATH")]
    db: Option<String>,

    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 显示订单的候选 lot 与当前배정
    Show { order_id: String },
    /// 勾选 lot（默认 1 托）, 可同时指定托数
    Assign(AssignArgs),
    /// 取消 lot
    Remove { order_id: String, lot_id: i64 },
    /// 取消全部 lot
    Clear {
        order_id: String,
        /// 确认取消全部
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// 删除已保存的草稿
    Discard { order_id: String },
    /// 列出有草稿的订单
    Drafts,
    /// 基于已保存草稿生成작업지시摘要
    WorkOrder(WorkOrderArgs),
    /// 本地配置
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args)]
struct AssignArgs {
    order_id: String,
    lot_id: i64,
    /// 托数; ≤ 0 等同取消
    #[arg(long, allow_hyphen_values = true)]
    trays: Option<String>,
}

#[derive(Args)]
struct WorkOrderArgs {
    order_id: String,
    #[arg(long)]
    location: String,
    /// 作业日期（YYYY-MM-DD, 默认订单交货日）
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    operator: Option<String>,
    #[arg(long)]
    note: Option<String>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_format(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::debug!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Show { order_id } => {
            let session = open(&state, &order_id).await?;
            print_session(&session, cli.json)?;
        }
        Commands::Assign(args) => {
            let mut session = open(&state, &args.order_id).await?;
            if !session.tracker().contains(args.lot_id) {
                session.toggle_lot(args.lot_id).map_err(user_error)?;
            }
            if let Some(trays) = &args.trays {
                session
                    .set_tray_count_input(args.lot_id, trays)
                    .map_err(user_error)?;
            }
            save(&state, &mut session)?;
            print_session(&session, cli.json)?;
        }
        Commands::Remove { order_id, lot_id } => {
            let mut session = open(&state, &order_id).await?;
            if session.remove_lot(lot_id) {
                save(&state, &mut session)?;
            }
            print_session(&session, cli.json)?;
        }
        Commands::Clear { order_id, yes } => {
            if !yes {
                return Err(anyhow!("{} (--yes)", t("matching.clear_confirm")));
            }
            let mut session = open(&state, &order_id).await?;
            session.clear_all(true).map_err(user_error)?;
            save(&state, &mut session)?;
            print_session(&session, cli.json)?;
        }
        Commands::Discard { order_id } => {
            let removed = state
                .matching_api
                .discard_draft(&order_id)
                .map_err(user_error)?;
            if removed {
                println!("{}", t("matching.draft_discarded"));
            } else {
                println!("{}", t("matching.draft_not_found"));
            }
        }
        Commands::Drafts => {
            let ids = state
                .drafts
                .list_order_ids()
                .context("无法读取草稿列表")?;
            if cli.json {
                print_json(&ids)?;
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        Commands::WorkOrder(args) => {
            let session = open(&state, &args.order_id).await?;
            let request = WorkOrderRequest {
                work_location: args.location,
                work_date: args.date,
                operator: args.operator,
                note: args.note,
            };
            let summary = state
                .matching_api
                .generate_work_order(Some(&session), &request)
                .map_err(user_error)?;
            if cli.json {
                print_json(&summary)?;
            } else {
                println!("{}", summary.render());
            }
        }
        Commands::Config(command) => handle_config_command(&state, command, cli.json)?,
    }

    Ok(())
}

async fn open(state: &AppState, order_id: &str) -> Result<MatchingSession> {
    state
        .matching_api
        .open_order(order_id)
        .await
        .map_err(user_error)
}

fn save(state: &AppState, session: &mut MatchingSession) -> Result<()> {
    state
        .matching_api
        .save_session(session)
        .map_err(user_error)?;
    tracing::info!(order_id = %session.order().id, "{}", t("matching.draft_saved"));
    Ok(())
}

fn user_error(err: ApiError) -> anyhow::Error {
    if err.is_retryable() && matches!(err, ApiError::Backend(_)) {
        anyhow!("{} ({})", t("matching.network_error"), err.user_message())
    } else {
        anyhow!("{}: {}", t("common.failed"), err.user_message())
    }
}

fn handle_config_command(state: &AppState, command: ConfigCommands, json: bool) -> Result<()> {
    let config = &state.config_manager;
    match command {
        ConfigCommands::Get { key } => {
            let value = config.get_config_value(&key).map_err(|e| anyhow!("{}", e))?;
            match value {
                Some(v) => println!("{}", v),
                None => println!("(unset)"),
            }
        }
        ConfigCommands::Set { key, value } => {
            config
                .set_config_value(&key, &value)
                .map_err(|e| anyhow!("{}", e))?;
            println!("{}", t("common.success"));
        }
        ConfigCommands::Unset { key } => {
            let removed = config.unset_config_value(&key).map_err(|e| anyhow!("{}", e))?;
            println!("{}", if removed { t("common.success") } else { "(unset)".to_string() });
        }
        ConfigCommands::List => {
            let all = config.list_configs().map_err(|e| anyhow!("{}", e))?;
            if json {
                print_json(&all)?;
            } else {
                for (k, v) in all {
                    println!("{} = {}", k, v);
                }
            }
        }
    }
    Ok(())
}

// ==========================================
// 输出
// ==========================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView<'a> {
    order_id: &'a str,
    required_grade: Option<String>,
    base_lots: &'a [EggLot],
    substitute_lots: &'a [EggLot],
    draft: egg_lot_matching::AllocationDraft,
    progress: egg_lot_matching::MatchingProgress,
}

fn print_session(session: &MatchingSession, json: bool) -> Result<()> {
    let progress = session.progress();

    if json {
        return print_json(&SessionView {
            order_id: &session.order().id,
            required_grade: session.required_grade().map(|g| g.label().to_string()),
            base_lots: &session.ranked().base_lots,
            substitute_lots: &session.ranked().substitute_lots,
            draft: session.to_draft(),
            progress,
        });
    }

    println!(
        "{} {}",
        session.order().id,
        session
            .order()
            .product_name
            .as_deref()
            .unwrap_or_default()
    );

    let groups = [
        (t("matching.base_lots"), &session.ranked().base_lots),
        (t("matching.substitute_lots"), &session.ranked().substitute_lots),
    ];
    for (title, lots) in groups {
        println!("== {} ({}) ==", title, lots.len());
        for lot in lots.iter() {
            print_lot_row(session, lot);
        }
    }
    if session.ranked().is_empty() {
        println!("{}", t("matching.no_lots"));
    }

    println!(
        "{}",
        t_with_args(
            "matching.allocated",
            &[
                ("allocated", &progress.allocated_eggs.to_string()),
                ("required", &progress.required_eggs.to_string()),
            ],
        )
    );
    println!(
        "{}",
        t_with_args("matching.progress", &[("percent", &progress.percent.to_string())])
    );
    Ok(())
}

fn print_lot_row(session: &MatchingSession, lot: &EggLot) {
    let tracker = session.tracker();
    let mark = match tracker.tray_count(lot.id) {
        Some(n) => format!("[x] {:>3}", n),
        None if lot.is_selectable() => "[ ]    ".to_string(),
        None => "[-]    ".to_string(),
    };
    println!(
        "{} #{:<6} {} {} {:>6} / {:>4}  {}",
        mark,
        lot.id,
        lot.weight_grade,
        lot.received_date,
        lot.quantity,
        lot.available_trays(),
        lot.location.as_deref().unwrap_or("-"),
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
