use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use offtake_lib::distributors::REGISTRY;
use offtake_lib::models::PeriodFilter;
use offtake_lib::{inspect, load_config, logging, periods, process, save_config, TransformRequest};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "offtake")]
#[command(about = "经销商出货报表转换为统一格式")]
struct Cli {
    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 列出所有经销商
    List,
    /// 转换一个原始文件
    Run(RunArgs),
    /// 列出原始文件中的期间 (YYYYMM)
    Periods(PeriodsArgs),
    /// 按行列列出原始单元格
    Inspect(InspectArgs),
    /// 查看或修改配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// 经销商编号或名称
    #[arg(short, long)]
    distributor: String,

    /// 原始报表 (.xls / .xlsx)
    #[arg(long)]
    raw: PathBuf,

    /// 对照表 (.xlsx)
    #[arg(long)]
    mapping: PathBuf,

    /// 输出目录，默认取配置
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// 只输出这些期间，可重复
    #[arg(long = "period")]
    periods: Vec<String>,

    /// 工作表名只有月日时使用的年份
    #[arg(long)]
    sheet_year: Option<i32>,

    /// 以 JSON 输出结果
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct PeriodsArgs {
    /// 经销商编号或名称
    #[arg(short, long)]
    distributor: String,

    /// 原始报表 (.xls / .xlsx)
    #[arg(long)]
    raw: PathBuf,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// 要查看的文件
    #[arg(long)]
    raw: PathBuf,

    /// 工作表名称，默认第一个
    #[arg(long)]
    sheet: Option<String>,

    /// 最多列出的行数
    #[arg(long, default_value_t = 20)]
    rows: usize,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// 显示当前配置
    Show,
    /// 修改配置并保存
    Set {
        /// 默认输出目录
        #[arg(long)]
        output_dir: Option<String>,

        /// 默认工作表年份
        #[arg(long)]
        sheet_year: Option<i32>,
    },
}

fn run(args: RunArgs) -> Result<bool> {
    let mut config = load_config();
    let request = TransformRequest {
        distributor: args.distributor,
        raw_file: args.raw,
        mapping_file: args.mapping,
        output_dir: args.output_dir,
        period: PeriodFilter::from_months(args.periods),
        sheet_year: args.sheet_year,
    };

    let result = process(&request, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(path) = &result.output_path {
        println!(
            "{}: {} 条 → {} (未对照客户 {}, 未对照 SKU {})",
            result.distributor,
            result.output_records,
            path,
            result.unmapped_customers,
            result.unmapped_products
        );
    } else {
        println!("{}: {}", result.distributor, result.message);
    }

    if result.success {
        config.last_distributor = Some(request.distributor);
        if let Err(e) = save_config(&config) {
            tracing::warn!("保存配置失败: {:#}", e);
        }
    }
    Ok(result.success)
}

fn execute(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::List => {
            for d in REGISTRY.iter() {
                println!("{}\t{}\t{}", d.id, d.label, d.group_name);
            }
        }
        Command::Run(args) => return run(args),
        Command::Periods(args) => {
            for period in periods(&args.distributor, &args.raw, &load_config())? {
                println!("{}", period);
            }
        }
        Command::Inspect(args) => {
            print!("{}", inspect(&args.raw, args.sheet.as_deref(), args.rows)?);
        }
        Command::Config { action } => {
            let mut config = load_config();
            if let ConfigAction::Set {
                output_dir,
                sheet_year,
            } = action
            {
                if let Some(dir) = output_dir {
                    config.output_dir = dir;
                }
                if let Some(year) = sheet_year {
                    config.sheet_year = year;
                }
                save_config(&config)?;
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
