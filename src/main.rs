//! # sub-rules
//!
//! 把自定义分流规则和代理组应用到 Clash 订阅上的 CLI 工具。
//!
//! ## 功能
//! - 规则集 ↔ URL token 的编解码
//! - 在命令行里编辑规则集
//! - 生成订阅转换链接
//! - 拉取订阅并合并规则集，输出新的 Clash 配置
//! - 导出 Clash Verge Rev 扩展脚本，在客户端本地合并
//!
//! ## 使用
//! ```bash
//! # 生成示例规则集的 token
//! sub-rules encode --preset default
//!
//! # 在 token 基础上添加规则
//! sub-rules edit "$TOKEN" --add direct-domain-suffix=example.cn --group-add Google:geoip=google
//!
//! # 拉取订阅并合并
//! sub-rules merge --rules "$TOKEN" --sub "https://sub.example.com/api?token=abc" -o config.yaml
//!
//! # 直接使用转换链接
//! sub-rules merge --link "https://rules.example.com/api?rules=...&sub=..."
//!
//! # 导出扩展脚本
//! sub-rules script "$TOKEN" -o sub-rules.js
//! ```

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod error;
mod merge;
mod rule;
mod subscription;

use error::Error;
use rule::codec;
use rule::edit::{Edit, GlobalEntry, GroupEntry, GroupFlag, GroupRename};
use rule::RuleSet;
use subscription::fetch::{self, DEFAULT_USER_AGENT};

// ========================================
// CLI 参数定义
// ========================================

/// Clash 订阅规则合并工具
#[derive(Parser)]
#[command(name = "sub-rules")]
#[command(version)]
#[command(about = "Apply custom routing rules and proxy groups to a Clash subscription")]
struct Cli {
    /// 显示调试日志
    #[arg(long, global = true)]
    debug: bool,

    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 规则集预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// 示例规则集
    Default,
    /// 空规则集
    Empty,
}

impl Preset {
    fn rule_set(self) -> RuleSet {
        match self {
            Preset::Default => RuleSet::example(),
            Preset::Empty => RuleSet::default(),
        }
    }
}

/// 支持的子命令
#[derive(Subcommand)]
enum Commands {
    /// 拉取订阅并合并规则集，输出新的配置
    Merge {
        /// 规则集 token
        #[arg(long, env = "SUB_RULES_TOKEN")]
        rules: Option<String>,

        /// 订阅地址（可以是百分号编码后的地址）
        #[arg(long, env = "SUB_RULES_SUB")]
        sub: Option<String>,

        /// 读取本地订阅文件，代替拉取 --sub
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,

        /// 订阅转换链接，从中读取 rules 和 sub 参数（优先于 --rules / --sub）
        #[arg(long, value_name = "URL")]
        link: Option<String>,

        /// 输出文件 (默认输出到 stdout)
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,

        /// 拉取订阅时使用的 User-Agent
        #[arg(long, default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },
    /// 输出规则集的 token
    Encode {
        /// 使用预设规则集
        #[arg(long, value_enum, default_value_t = Preset::Default)]
        preset: Preset,

        /// 从 JSON 文件读取规则集 (优先于 --preset)
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// 把 token 解码为 JSON
    Decode {
        /// 规则集 token
        token: String,

        /// 格式化输出
        #[arg(long)]
        pretty: bool,
    },
    /// 生成订阅转换链接
    Link {
        /// 转换服务地址
        #[arg(long, value_name = "URL")]
        base: String,

        /// 规则集 token
        #[arg(long, env = "SUB_RULES_TOKEN")]
        rules: String,

        /// 原始订阅地址
        #[arg(long, env = "SUB_RULES_SUB")]
        sub: String,
    },
    /// 编辑规则集并输出新的 token
    Edit {
        /// 要编辑的 token
        #[arg(required_unless_present = "preset")]
        token: Option<String>,

        /// 从预设开始编辑
        #[arg(long, value_enum, conflicts_with = "token")]
        preset: Option<Preset>,

        /// 添加全局规则，如 proxy-domain-suffix=example.com
        #[arg(long, value_name = "CATEGORY=VALUE")]
        add: Vec<GlobalEntry>,

        /// 删除全局规则
        #[arg(long, value_name = "CATEGORY=VALUE")]
        remove: Vec<GlobalEntry>,

        /// 添加自定义代理组
        #[arg(long, value_name = "NAME")]
        add_group: Vec<String>,

        /// 删除自定义代理组
        #[arg(long, value_name = "NAME")]
        remove_group: Vec<String>,

        /// 重命名自定义代理组，如 Google=Search
        #[arg(long, value_name = "OLD=NEW")]
        rename_group: Vec<GroupRename>,

        /// 设置代理组的 direct-first，如 Apple=true
        #[arg(long, value_name = "NAME=BOOL")]
        group_direct_first: Vec<GroupFlag>,

        /// 添加组规则或过滤词，如 Google:geosite=google、DLsite:filter=jp
        #[arg(long, value_name = "NAME:FIELD=VALUE")]
        group_add: Vec<GroupEntry>,

        /// 删除组规则或过滤词
        #[arg(long, value_name = "NAME:FIELD=VALUE")]
        group_remove: Vec<GroupEntry>,
    },
    /// 导出 Clash Verge Rev 扩展脚本
    Script {
        /// 规则集 token
        #[arg(required_unless_present = "preset")]
        token: Option<String>,

        /// 使用预设规则集
        #[arg(long, value_enum, conflicts_with = "token")]
        preset: Option<Preset>,

        /// 输出文件 (默认输出到 stdout)
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

// ========================================
// 主函数
// ========================================

fn main() {
    // 解析命令行参数
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // 执行对应的子命令
    let result = match cli.command {
        Commands::Merge {
            rules,
            sub,
            input,
            link,
            output,
            user_agent,
        } => run_merge(rules, sub, input, link, output, &user_agent),
        Commands::Encode { preset, file } => run_encode(preset, file),
        Commands::Decode { token, pretty } => run_decode(&token, pretty),
        Commands::Link { base, rules, sub } => run_link(&base, &rules, &sub),
        Commands::Edit {
            token,
            preset,
            add,
            remove,
            add_group,
            remove_group,
            rename_group,
            group_direct_first,
            group_add,
            group_remove,
        } => {
            // 操作顺序：建组 → 改名 → 删除 → 添加 → 开关 → 删组
            let edits: Vec<Edit> = add_group
                .into_iter()
                .map(Edit::AddGroup)
                .chain(rename_group.into_iter().map(Edit::RenameGroup))
                .chain(remove.into_iter().map(Edit::Remove))
                .chain(group_remove.into_iter().map(Edit::GroupRemove))
                .chain(add.into_iter().map(Edit::Add))
                .chain(group_add.into_iter().map(Edit::GroupAdd))
                .chain(group_direct_first.into_iter().map(Edit::SetDirectFirst))
                .chain(remove_group.into_iter().map(Edit::RemoveGroup))
                .collect();
            run_edit(token, preset, &edits)
        }
        Commands::Script {
            token,
            preset,
            output,
        } => run_script(token, preset, output),
    };

    // 处理错误
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        let code = e.downcast_ref::<Error>().map_or(1, Error::exit_code);
        process::exit(code);
    }
}

/// 初始化日志：默认 info，--debug 时 debug，RUST_LOG 优先
fn init_tracing(debug: bool) {
    let default_directive = if debug { "sub_rules=debug" } else { "sub_rules=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ========================================
// 合并命令实现
// ========================================

/// 执行合并命令
fn run_merge(
    rules: Option<String>,
    sub: Option<String>,
    input: Option<PathBuf>,
    link: Option<String>,
    output: Option<PathBuf>,
    user_agent: &str,
) -> Result<()> {
    // 1. 确定 token 和订阅来源，缺任何一个都在拉取前拒绝
    let (token, sub) = match link {
        Some(link) => {
            let params = subscription::link::parse_link(&link)?;
            (params.rules, params.sub)
        }
        None => (rules, sub),
    };
    let token = token.ok_or(Error::MissingInput("rule-set token"))?;
    if input.is_none() && sub.is_none() {
        return Err(Error::MissingInput("subscription url").into());
    }

    // 2. 解码规则集，损坏时不回退到默认规则集
    let rule_set = codec::decode(Some(token.as_str())).ok_or(Error::Decode)?;
    debug!(groups = rule_set.proxy_groups.len(), "decoded rule-set");

    // 3. 读取订阅
    let text = match (input, sub) {
        (Some(path), _) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read subscription file: {}", path.display()))?,
        (None, Some(sub)) => {
            let url = fetch::resolve_source_url(&sub)?;
            info!(url = %url, "fetching subscription");
            let fetched = fetch::fetch(&url, user_agent)?;

            if let Some(info) = fetched
                .headers
                .get("subscription-userinfo")
                .and_then(|v| v.to_str().ok())
            {
                info!(userinfo = info, "subscription usage");
            }
            for (name, value) in &fetched.headers {
                debug!(header = %name, value = ?value, "upstream header");
            }
            fetched.body
        }
        (None, None) => return Err(Error::MissingInput("subscription url").into()),
    };

    // 4. 解析 → 合并 → 输出
    let config = subscription::parse_document(&text)?;
    let merged = merge::merge(&config, &rule_set)?;
    info!(
        rules = merged.rules.len() - config.rules.len(),
        groups = merged.proxy_groups.len() - config.proxy_groups.len(),
        "merged rule-set into subscription"
    );
    for group in merged.proxy_groups.iter().skip(1).take(rule_set.proxy_groups.len()) {
        debug!(
            group = %group.name,
            kind = group.kind().unwrap_or("-"),
            members = group.members().len(),
            "generated proxy group"
        );
    }

    let yaml = subscription::to_document(&merged)?;
    write_output(output, &yaml)
}

fn write_output(output: Option<PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "config written");
        }
        None => print!("{}", content),
    }
    Ok(())
}

// ========================================
// 规则集命令实现
// ========================================

/// 输出规则集 token
fn run_encode(preset: Preset, file: Option<PathBuf>) -> Result<()> {
    let rule_set = match file {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read rule-set file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid rule-set file: {}", path.display()))?
        }
        None => preset.rule_set(),
    };

    println!("{}", encode_token(&rule_set)?);
    Ok(())
}

/// 把 token 解码为 JSON
fn run_decode(token: &str, pretty: bool) -> Result<()> {
    let rule_set = codec::decode(Some(token)).ok_or(Error::Decode)?;
    let json = if pretty {
        serde_json::to_string_pretty(&rule_set)?
    } else {
        serde_json::to_string(&rule_set)?
    };
    println!("{}", json);
    Ok(())
}

/// 生成订阅转换链接
fn run_link(base: &str, rules: &str, sub: &str) -> Result<()> {
    // 先校验 token，避免生成一条打不开的链接
    codec::decode(Some(rules)).ok_or(Error::Decode)?;
    println!("{}", subscription::link::build_link(base, rules, sub)?);
    Ok(())
}

/// 从 token 或预设取得规则集
fn load_rule_set(token: Option<String>, preset: Option<Preset>) -> Result<RuleSet> {
    match (token, preset) {
        (Some(token), _) => Ok(codec::decode(Some(token.as_str())).ok_or(Error::Decode)?),
        (None, Some(preset)) => Ok(preset.rule_set()),
        (None, None) => Err(Error::MissingInput("rule-set token").into()),
    }
}

/// 编辑规则集
fn run_edit(token: Option<String>, preset: Option<Preset>, edits: &[Edit]) -> Result<()> {
    let mut rule_set = load_rule_set(token, preset)?;

    rule_set.apply_all(edits)?;
    debug!(edits = edits.len(), "rule-set edited");

    println!("{}", encode_token(&rule_set)?);
    Ok(())
}

fn encode_token(rule_set: &RuleSet) -> Result<String> {
    codec::encode(rule_set).context("Failed to encode rule-set")
}

/// 导出扩展脚本
fn run_script(
    token: Option<String>,
    preset: Option<Preset>,
    output: Option<PathBuf>,
) -> Result<()> {
    let rule_set = load_rule_set(token, preset)?;
    let script = rule::script::render_script(&rule_set).context("Failed to render script")?;
    debug!(groups = rule_set.proxy_groups.len(), "extension script rendered");
    write_output(output, &script)
}
