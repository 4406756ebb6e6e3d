//! Configuration types for the block builder

use crate::error::{BlockBuilderError, Result};
use primitive_types::U256;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Fixed-point denominator of [`SpaceRatio`] (18 decimal places).
const RATIO_SCALE: u64 = 1_000_000_000_000_000_000;

/// Maximum fractional digits accepted by [`SpaceRatio::from_str`].
const RATIO_DECIMALS: usize = 18;

/// Share of the block a lane may fill, in `[0, 1]`.
///
/// Stored as an exact 18-decimal fixed-point value so that every node derives
/// identical byte limits from the same configuration string. Zero means the
/// lane takes whatever the global budget has left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct SpaceRatio {
    parts: u64,
}

impl SpaceRatio {
    /// "Whatever remains".
    pub const ZERO: Self = Self { parts: 0 };

    /// The whole block.
    pub const ONE: Self = Self { parts: RATIO_SCALE };

    /// Builds `numerator / denominator`, rounding down to 18 decimals.
    pub fn from_fraction(numerator: u64, denominator: u64) -> Result<Self> {
        if denominator == 0 || numerator > denominator {
            return Err(BlockBuilderError::InvalidConfig(format!(
                "space ratio {numerator}/{denominator} outside [0, 1]"
            )));
        }
        let parts = numerator as u128 * RATIO_SCALE as u128 / denominator as u128;
        Ok(Self { parts: parts as u64 })
    }

    /// Returns true for the "whatever remains" ratio.
    pub fn is_zero(&self) -> bool {
        self.parts == 0
    }

    /// Bytes of `max_bytes` this ratio grants, rounded down.
    pub fn apply(&self, max_bytes: u64) -> u64 {
        (max_bytes as u128 * self.parts as u128 / RATIO_SCALE as u128) as u64
    }

    fn parts(&self) -> u64 {
        self.parts
    }
}

impl FromStr for SpaceRatio {
    type Err = BlockBuilderError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            BlockBuilderError::InvalidConfig(format!("space ratio {s:?}: {reason}"))
        };

        let trimmed = s.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("not a decimal"));
        }
        if frac.len() > RATIO_DECIMALS {
            return Err(invalid("more than 18 decimal places"));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("out of range"))?
        };
        if whole > 1 {
            return Err(invalid("above 1"));
        }

        let mut frac_parts: u64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid("out of range"))?
        };
        for _ in frac.len()..RATIO_DECIMALS {
            frac_parts *= 10;
        }

        let parts = whole * RATIO_SCALE + frac_parts;
        if parts > RATIO_SCALE {
            return Err(invalid("above 1"));
        }
        Ok(Self { parts })
    }
}

impl TryFrom<String> for SpaceRatio {
    type Error = BlockBuilderError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for SpaceRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.parts / RATIO_SCALE;
        let frac = self.parts % RATIO_SCALE;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

/// Lane implementations. The set is closed so that partitioning can be
/// checked when the chain is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneKind {
    /// Top-of-block auction; claims bid transactions.
    Auction,
    /// Fee-free block space; claims free transactions.
    Free,
    /// Catch-all; implicitly ignores every other lane.
    Default,
}

/// One lane of the chain.
#[derive(Clone, Debug, Deserialize)]
pub struct LaneConfig {
    /// Unique lane name
    pub name: String,

    /// Lane implementation
    pub kind: LaneKind,

    /// Share of the block, decimal string in `[0, 1]`
    pub max_block_space: SpaceRatio,

    /// Names of lanes whose transactions this lane must not claim
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Index capacity (absent = unbounded)
    #[serde(default)]
    pub max_txs: Option<usize>,
}

impl LaneConfig {
    /// Lane with no explicit ignore list and an unbounded index.
    pub fn new(name: impl Into<String>, kind: LaneKind, max_block_space: SpaceRatio) -> Self {
        Self {
            name: name.into(),
            kind,
            max_block_space,
            ignore: Vec::new(),
            max_txs: None,
        }
    }
}

/// Auction rules
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
    /// Minimum bid amount
    pub reserve_price: U256,

    /// Minimum amount a new bid must add over the current top bid (CheckTx only)
    pub min_bid_increment: U256,

    /// Maximum bundled transactions per bid
    pub max_bundle_size: usize,

    /// Enforce bundle signer continuity
    pub front_running_protection: bool,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            reserve_price: U256::from(crate::DEFAULT_RESERVE_PRICE),
            min_bid_increment: U256::from(crate::DEFAULT_MIN_BID_INCREMENT),
            max_bundle_size: crate::DEFAULT_MAX_BUNDLE_SIZE,
            front_running_protection: true,
        }
    }
}

/// Log output settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Runtime configuration for the block builder
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Lanes in chain order
    pub lanes: Vec<LaneConfig>,

    /// Auction rules
    pub auction: AuctionConfig,

    /// Largest `max_bytes` a received proposal record may advertise
    pub max_block_bytes_cap: Option<u64>,

    /// Logging
    pub logging: LoggingConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        let ratio = |num| SpaceRatio {
            parts: RATIO_SCALE / 100 * num,
        };
        Self {
            lanes: vec![
                LaneConfig::new("auction", LaneKind::Auction, ratio(20)),
                LaneConfig::new("free", LaneKind::Free, ratio(20)),
                LaneConfig::new("default", LaneKind::Default, SpaceRatio::ZERO),
            ],
            auction: AuctionConfig::default(),
            max_block_bytes_cap: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl BuilderConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BlockBuilderError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Position of the auction lane, if configured.
    pub fn auction_lane(&self) -> Option<usize> {
        self.lanes.iter().position(|l| l.kind == LaneKind::Auction)
    }

    /// Resolved ignore sets, as lane positions.
    ///
    /// Default lanes ignore every other lane.
    pub fn resolved_ignores(&self) -> Result<Vec<Vec<usize>>> {
        let positions: HashMap<&str, usize> = self
            .lanes
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.as_str(), i))
            .collect();

        self.lanes
            .iter()
            .enumerate()
            .map(|(i, lane)| {
                if lane.kind == LaneKind::Default {
                    return Ok((0..self.lanes.len()).filter(|&j| j != i).collect());
                }
                lane.ignore
                    .iter()
                    .map(|name| {
                        positions.get(name.as_str()).copied().ok_or_else(|| {
                            BlockBuilderError::InvalidConfig(format!(
                                "lane {} ignores unknown lane {name}",
                                lane.name
                            ))
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BlockBuilderError::InvalidConfig(msg));

        if self.lanes.is_empty() {
            return invalid("at least one lane is required".into());
        }

        let mut names = HashSet::new();
        for lane in &self.lanes {
            if !names.insert(lane.name.as_str()) {
                return invalid(format!("duplicate lane name {}", lane.name));
            }
            if lane.ignore.iter().any(|n| n == &lane.name) {
                return invalid(format!("lane {} ignores itself", lane.name));
            }
        }

        let count = |kind| self.lanes.iter().filter(|l| l.kind == kind).count();
        if count(LaneKind::Auction) > 1 {
            return invalid("more than one auction lane".into());
        }
        if count(LaneKind::Default) > 1 {
            return invalid("more than one default lane".into());
        }
        if self.auction_lane().is_some_and(|pos| pos != 0) {
            return invalid("the auction lane must be first".into());
        }

        let total: u128 = self
            .lanes
            .iter()
            .map(|l| l.max_block_space.parts() as u128)
            .sum();
        if total > RATIO_SCALE as u128 {
            return invalid("lane block space ratios sum above 1".into());
        }

        let ignores = self.resolved_ignores()?;
        if let Some(lane) = find_ignore_cycle(&ignores) {
            return invalid(format!(
                "ignore relation of lane {} is cyclic",
                self.lanes[lane].name
            ));
        }

        // Lanes whose predicates overlap must be separated by an ignore edge.
        for i in 0..self.lanes.len() {
            for j in (i + 1)..self.lanes.len() {
                let (a, b) = (&self.lanes[i], &self.lanes[j]);
                if a.kind == b.kind && !ignores[i].contains(&j) && !ignores[j].contains(&i) {
                    return invalid(format!(
                        "lanes {} and {} both claim the same transactions",
                        a.name, b.name
                    ));
                }
            }
        }

        if self.auction.max_bundle_size == 0 {
            return invalid("max_bundle_size must be positive".into());
        }

        Ok(())
    }
}

/// Returns a lane on a cycle of the ignore graph, if any.
fn find_ignore_cycle(ignores: &[Vec<usize>]) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(node: usize, ignores: &[Vec<usize>], marks: &mut [Mark]) -> Option<usize> {
        match marks[node] {
            Mark::Active => return Some(node),
            Mark::Done => return None,
            Mark::New => {}
        }
        marks[node] = Mark::Active;
        for &next in &ignores[node] {
            if let Some(found) = visit(next, ignores, marks) {
                return Some(found);
            }
        }
        marks[node] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::New; ignores.len()];
    (0..ignores.len()).find_map(|node| visit(node, ignores, &mut marks))
}
