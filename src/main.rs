// ==========================================
// 蛋品冷链溯源分析系统 - 命令行入口
// ==========================================
// 命令: analyze / config / history
// 凭证: 仅从命令行参数或环境变量读取,不写入配置库
// ==========================================

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use egg_trace::api::{AnalysisApi, RunOptions};
use egg_trace::config::{ConfigManager, ProviderKind};
use egg_trace::db::get_default_db_path;
use egg_trace::domain::bundle::ResultBundle;
use egg_trace::narrative::PromptTemplate;
use egg_trace::repository::RunLogRepository;
use egg_trace::{logging, APP_NAME, VERSION};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "egg-trace")]
#[command(about = "Egg cold-chain traceability analysis")]
#[command(version)]
struct Cli {
    /// SQLite 数据库路径
    #[arg(long, global = true, env = "EGG_TRACE_DB_PATH")]
    db: Option<PathBuf>,

    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 分析溯源数据文件（.csv / .xlsx / .xls / .json）
    Analyze(AnalyzeArgs),

    /// 管理配置覆写
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 查看最近的运行记录
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// 输入文件（可多个,并发分析）
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// 报告输出目录（默认当前目录）
    #[arg(long)]
    out: Option<PathBuf>,

    /// 同时写出结果包 JSON
    #[arg(long)]
    bundle_json: bool,

    /// 报告生成服务（openai / gemini / xai / groq）
    #[arg(long)]
    provider: Option<ProviderKind>,

    #[arg(long)]
    model: Option<String>,

    /// 服务端点（兼容网关）
    #[arg(long)]
    base_url: Option<String>,

    /// API 凭证（优先于环境变量）
    #[arg(long)]
    api_key: Option<String>,

    /// 报告语言（en / zh-TW）
    #[arg(long)]
    locale: Option<String>,

    /// 报告模板（traceability_analyst / recall_commander / consumer_story）
    #[arg(long)]
    template: Option<PromptTemplate>,

    #[command(flatten)]
    env_keys: EnvKeys,
}

/// 各服务的环境变量凭证
#[derive(Args, Debug)]
struct EnvKeys {
    #[arg(long, env = "OPENAI_API_KEY", hide = true, hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide = true, hide_env_values = true)]
    gemini_api_key: Option<String>,

    #[arg(long, env = "XAI_API_KEY", hide = true, hide_env_values = true)]
    xai_api_key: Option<String>,

    #[arg(long, env = "GROQ_API_KEY", hide = true, hide_env_values = true)]
    groq_api_key: Option<String>,
}

impl EnvKeys {
    fn for_provider(&self, kind: ProviderKind) -> Option<String> {
        match kind {
            ProviderKind::OpenAi => self.openai_api_key.clone(),
            ProviderKind::Gemini => self.gemini_api_key.clone(),
            ProviderKind::Xai => self.xai_api_key.clone(),
            ProviderKind::Groq => self.groq_api_key.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 列出全部覆写
    List,
    /// 查询单个覆写
    Get { key: String },
    /// 设置覆写
    Set { key: String, value: String },
    /// 删除覆写（恢复默认）
    Unset { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    info!(app = APP_NAME, version = VERSION, db = %db_path, "启动");

    let config_manager =
        Arc::new(ConfigManager::new(&db_path).context("无法打开配置数据库")?);

    match cli.command {
        Command::Analyze(args) => analyze(config_manager, &db_path, args).await,
        Command::Config(cmd) => run_config(&config_manager, cmd),
        Command::History { limit } => {
            let repo = RunLogRepository::new(&db_path).context("无法打开运行记录")?;
            for run in repo.list_recent(limit)? {
                println!(
                    "{}  {}  {:<18} {:>5} records {:>4} violations  score={}  {}  {}",
                    run.created_at,
                    run.run_id,
                    run.shape,
                    run.record_count,
                    run.violation_count,
                    run.risk_score
                        .map(|s| format!("{:.1}", s))
                        .unwrap_or_else(|| "-".to_string()),
                    run.terminal_state,
                    run.dataset_name,
                );
            }
            Ok(())
        }
    }
}

async fn analyze(
    config_manager: Arc<ConfigManager>,
    db_path: &str,
    args: AnalyzeArgs,
) -> Result<()> {
    // 服务选择: 命令行优先,其次配置库
    let stored = config_manager.load()?;
    let provider = args.provider.or(stored.narrative.provider);
    let api_key = args
        .api_key
        .clone()
        .or_else(|| provider.and_then(|p| args.env_keys.for_provider(p)));

    let options = RunOptions {
        provider,
        model: args.model.clone(),
        api_key,
        base_url: args.base_url.clone(),
        locale: args.locale.clone(),
        template: args.template,
    };

    let run_log_repo = Arc::new(RunLogRepository::new(db_path).context("无法打开运行记录")?);
    let api = AnalysisApi::new(config_manager, run_log_repo);

    let out_dir = args.out.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("无法创建输出目录 {}", out_dir.display()))?;

    let results = api.analyze_many(&args.files, &options).await;

    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(bundle) => write_outputs(&bundle, &out_dir, args.bundle_json)?,
            Err(e) => {
                failures += 1;
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} 个文件分析失败", failures);
    }
    Ok(())
}

fn write_outputs(bundle: &ResultBundle, out_dir: &std::path::Path, bundle_json: bool) -> Result<()> {
    // 同日多次运行以 run_id 前缀区分
    let stem = bundle.report_file_name();
    let stem = stem.trim_end_matches(".md");
    let short_id: String = bundle.run_id.chars().take(8).collect();

    let report_path = out_dir.join(format!("{}_{}.md", stem, short_id));
    let report = bundle.final_report.as_deref().unwrap_or_default();
    std::fs::write(&report_path, report)
        .with_context(|| format!("无法写入 {}", report_path.display()))?;

    println!(
        "{}  shape={}  state={}  score={}  report={}",
        bundle.dataset_name,
        bundle.shape,
        bundle.state,
        bundle
            .risk
            .score()
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "-".to_string()),
        report_path.display()
    );

    if bundle_json {
        let json_path = out_dir.join(format!("{}_{}.json", stem, short_id));
        let content = serde_json::to_string_pretty(bundle)?;
        std::fs::write(&json_path, content)
            .with_context(|| format!("无法写入 {}", json_path.display()))?;
    }
    Ok(())
}

fn run_config(config_manager: &ConfigManager, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::List => {
            for (key, value) in config_manager.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigCommand::Get { key } => match config_manager.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("{} 未设置（使用默认值）", key),
        },
        ConfigCommand::Set { key, value } => {
            config_manager.set(&key, &value)?;
            println!("{} = {}", key, value);
        }
        ConfigCommand::Unset { key } => {
            if config_manager.delete(&key)? {
                println!("已删除 {}", key);
            } else {
                println!("{} 未设置", key);
            }
        }
    }
    Ok(())
}
