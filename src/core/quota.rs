use chrono::{DateTime, Local, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Tier::Free),
            "premium" => Some(Tier::Premium),
            _ => None,
        }
    }

    /// Total trainable models for this tier.
    pub fn model_limit(self) -> u32 {
        match self {
            Tier::Free => 5,
            Tier::Premium => 100,
        }
    }

    /// Generations allowed per calendar day (local time).
    pub fn daily_generation_limit(self) -> u32 {
        match self {
            Tier::Free => 20,
            Tier::Premium => 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct QuotaView {
    pub models_limit: u32,
    pub models_used: u32,
    pub models_remaining: u32,
    pub generations_limit: u32,
    pub generations_used: u32,
    pub generations_remaining: u32,
}

/// Compute remaining quota for both dimensions. Saturates at zero so that
/// usage above a lowered limit (e.g. after a downgrade) never reads negative.
pub fn evaluate(tier: Tier, models_owned: u32, generations_today: u32) -> QuotaView {
    let models_limit = tier.model_limit();
    let generations_limit = tier.daily_generation_limit();
    QuotaView {
        models_limit,
        models_used: models_owned,
        models_remaining: models_limit.saturating_sub(models_owned),
        generations_limit,
        generations_used: generations_today,
        generations_remaining: generations_limit.saturating_sub(generations_today),
    }
}

/// Unix timestamp of local midnight for the given instant. The daily
/// generation counter is defined over [midnight, now] and recomputed on
/// every call, never cached.
pub fn local_midnight_epoch(now: DateTime<Local>) -> i64 {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match midnight.and_local_timezone(Local) {
        chrono::LocalResult::Single(dt) => dt.timestamp(),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.timestamp(),
        // Midnight skipped by a DST jump: fall back to the day start in UTC terms.
        chrono::LocalResult::None => midnight.and_utc().timestamp(),
    }
}
