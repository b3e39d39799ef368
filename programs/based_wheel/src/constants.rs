// ── Stake & Calendar ──────────────────────────────────────────────────────
pub const SPIN_PRICE:      u64 = 420_000;   // 0.00042 SOL per paid spin
pub const SECONDS_PER_DAY: i64 = 86_400;    // UTC calendar day, not a rolling window

// ── Tier Table ────────────────────────────────────────────────────────────
// A draw in 0..ROLL_DOMAIN lands in the first band whose upper bound exceeds
// it. Bounds are cumulative, strictly increasing and end at ROLL_DOMAIN.
//
//   Tier 0  0    .. 9500   95.00%   motivational, no payout
//   Tier 1  9500 .. 9900    4.00%   0.001 SOL
//   Tier 2  9900 .. 9990    0.90%   0.01 SOL
//   Tier 3  9990 .. 9999    0.09%   0.05 SOL
//   Tier 4  9999 .. 10000   0.01%   JACKPOT_BPS of the pool
pub const ROLL_DOMAIN: u64 = 10_000;
pub const TIER_BOUNDS: [u64; 5] = [9_500, 9_900, 9_990, 9_999, ROLL_DOMAIN];
pub const TIER_PAYOUTS: [u64; 4] = [0, 1_000_000, 10_000_000, 50_000_000];
pub const JACKPOT_TIER: u8 = 4;

// ── Basis Points (/10000) ─────────────────────────────────────────────────
pub const BPS_DENOMINATOR: u64 = 10_000;
pub const JACKPOT_BPS:     u64 = 3_000;     // 30% of the pool at settlement
pub const MAX_SKIM_BPS:    u16 = 4_000;     // admin skim ceiling, 40%

// ── Transaction Guard ─────────────────────────────────────────────────────
pub const COMPUTE_BUDGET_PROGRAM_ID: anchor_lang::prelude::Pubkey =
    anchor_lang::pubkey!("ComputeBudget111111111111111111111111111111");

// ── PDA Seeds ─────────────────────────────────────────────────────────────
pub const POOL_SEED:   &[u8] = b"wheel_pool";
pub const PLAYER_SEED: &[u8] = b"player";
pub const SPIN_SEED:   &[u8] = b"spin";

// ── Result Messages ───────────────────────────────────────────────────────
pub const MAX_MESSAGE_LEN: usize = 32;

pub const MOTIVATIONS: [&str; 8] = [
    "GM legend",
    "HODL",
    "LFG",
    "Stay Based",
    "You will make it",
    "Wen lambo? TODAY",
    "Based & redpilled",
    "Just ship it",
];

// Fixed-tier wins are worded from the amount actually paid.
pub const JACKPOT_MESSAGE:    &str = "JACKPOT!!!";
pub const EMPTY_POOL_MESSAGE: &str = "Pool empty, no payout";
