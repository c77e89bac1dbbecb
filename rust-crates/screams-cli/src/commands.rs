use anyhow::{
    Context,
    anyhow,
};
use fuels::types::{
    Address,
    Identity,
    U256,
};
use serde::Serialize;
use somnia_screams::{
    achievements::{
        AchievementCategory,
        Catalog,
        catalog::bits,
    },
    collector::{
        SessionSummary,
        SoulCollector,
    },
    config::GameConfig,
    error::BatchError,
    ledger::{
        InMemoryLedger,
        SoulLedger,
    },
    session::SessionKey,
};
use std::{
    fmt::Write,
    path::Path,
};

const SIMULATED_PLAYER: [u8; 32] = [7u8; 32];
const SIMULATED_SESSION: u64 = 1;
const XP_PER_SOUL: u64 = 5;

pub fn parse_flags(raw: &str) -> anyhow::Result<U256> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => U256::from_str_radix(hex, 16)
            .map_err(|e| anyhow!("invalid hex flags '{raw}': {e:?}"))?,
        None => U256::from_dec_str(trimmed)
            .map_err(|e| anyhow!("invalid decimal flags '{raw}': {e:?}"))?,
    };
    Ok(parsed)
}

pub fn decode(
    flags: U256,
    category: Option<AchievementCategory>,
    json: bool,
) -> anyhow::Result<String> {
    let catalog = Catalog::builtin();
    let records = match category {
        Some(category) => catalog.filter_by_category(flags, category),
        None => catalog.decode_all(flags),
    };
    let progress = catalog.progress_percentage(flags);
    if json {
        let value = serde_json::json!({
            "progress": progress,
            "achievements": records,
        });
        return serde_json::to_string_pretty(&value).context("serializing achievements");
    }
    let mut out = String::new();
    for record in &records {
        let mark = if record.unlocked { 'x' } else { ' ' };
        writeln!(
            out,
            "[{mark}] #{:<3} {:<15} {:<12} {}",
            record.id, record.name, record.category, record.requirement
        )?;
    }
    write!(out, "progress: {progress:.1}%")?;
    Ok(out)
}

pub fn resolve_config(
    path: Option<&Path>,
    batch_limit: Option<u32>,
    points_per_soul: Option<u64>,
) -> anyhow::Result<GameConfig> {
    let mut config = match path {
        Some(path) => GameConfig::load(path).context("loading game config")?,
        None => GameConfig::default(),
    };
    if let Some(limit) = batch_limit {
        config.batch_limit = limit;
    }
    if let Some(points) = points_per_soul {
        config.points_per_soul = points;
    }
    config.validate().context("validating game config")?;
    Ok(config)
}

#[derive(Clone, Copy, Debug)]
pub struct SimulateOptions {
    pub souls: u32,
    pub fail_first: bool,
    pub deferred: bool,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub summary: SessionSummary,
    pub failed_submissions: u32,
    pub accepted_submissions: u32,
    pub unlocked: Vec<&'static str>,
    pub progress: f64,
}

pub async fn simulate(
    config: &GameConfig,
    options: SimulateOptions,
) -> anyhow::Result<SimulationReport> {
    let (ledger, events) = InMemoryLedger::with_points_per_soul(config.points_per_soul);
    let ledger = if options.deferred {
        ledger.deferred_confirmations()
    } else {
        ledger
    };
    let player = Identity::Address(Address::from(SIMULATED_PLAYER));
    let mut collector = SoulCollector::new(ledger, events, config);
    collector
        .start_session(SessionKey::new(player.clone(), SIMULATED_SESSION))
        .await?;
    if options.fail_first {
        collector.ledger().fail_next_submissions(1)?;
    }

    let mut failed_submissions = 0;
    for _ in 0..options.souls {
        match collector.collect_soul().await {
            Ok(_) => {}
            Err(BatchError::SubmissionFailed { count, source }) => {
                tracing::warn!(count, %source, "batch rejected, souls kept for retry");
                failed_submissions += 1;
            }
            Err(e) => return Err(e.into()),
        }
        collector.sync_events().await?;
    }

    let ledger = collector.ledger().clone();
    ledger.grant_experience(&player, u64::from(options.souls) * XP_PER_SOUL)?;
    if options.souls > 0 {
        ledger.unlock_achievement(&player, bits::SOUL_SEEKER)?;
    }
    if options.souls >= 100 {
        ledger.unlock_achievement(&player, bits::SOUL_GATHERER)?;
    }
    collector.sync_events().await?;

    let summary = collector.end_session().await?;
    if summary.confirmed_count > 0 {
        ledger.unlock_achievement(&player, bits::BATCH_RUNNER)?;
    }
    let flags = ledger.achievement_flags(&player).await?;
    let catalog = collector.catalog();
    let unlocked = catalog
        .decode_all(flags)
        .into_iter()
        .filter(|record| record.unlocked)
        .map(|record| record.key)
        .collect();

    Ok(SimulationReport {
        summary,
        failed_submissions,
        accepted_submissions: ledger.submissions()?,
        unlocked,
        progress: catalog.progress_percentage(flags),
    })
}

pub fn render_report(report: &SimulationReport, json: bool) -> anyhow::Result<String> {
    if json {
        return serde_json::to_string_pretty(report).context("serializing report");
    }
    let summary = &report.summary;
    let mut out = String::new();
    writeln!(out, "session {}", summary.session)?;
    writeln!(out, "confirmed souls: {}", summary.confirmed_count)?;
    writeln!(out, "confirmed points: {}", summary.confirmed_points)?;
    writeln!(out, "unconfirmed souls: {}", summary.unconfirmed)?;
    writeln!(
        out,
        "submissions: {} accepted, {} failed",
        report.accepted_submissions, report.failed_submissions
    )?;
    write!(
        out,
        "achievements: {} ({:.1}%)",
        report.unlocked.join(", "),
        report.progress
    )?;
    Ok(out)
}
