use anchor_lang::prelude::*;

use crate::constants::*;
use crate::{tier_for_roll, WheelError};

// ══════════════════════════════════════════════════════════════════════════
//  POOL
// ══════════════════════════════════════════════════════════════════════════

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Running,
    Stopped,
}

/// The ledger: one per deployment, created by `initialize`.
///
/// `balance` only moves through `deposit`, `settle` and the admin withdrawals,
/// so at every instruction boundary
/// `balance == total_deposited - total_paid_out - total_withdrawn`.
#[account]
pub struct WheelPool {
    pub authority:        Pubkey,      // 32
    pub balance:          u64,         // 8
    pub status:           GameStatus,  // 1
    pub bump:             u8,          // 1
    // ── Accounting totals ──
    pub total_deposited:  u64,         // 8
    pub total_paid_out:   u64,         // 8
    pub total_withdrawn:  u64,         // 8
    // ── Transparency counters ──
    pub total_spins:      u64,         // 8, next spin sequence number
    pub total_free_spins: u64,         // 8
    pub total_wins:       u64,         // 8
    pub biggest_win:      u64,         // 8
}
impl WheelPool { pub const LEN: usize = 32 + 8 + 1 + 1 + 8 + 8 + 8 + 8 + 8 + 8 + 8; }

/// Outcome of one settled spin, as recorded by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub seq:    u64,
    pub tier:   u8,
    pub amount: u64,
}

impl WheelPool {
    pub fn new(authority: Pubkey, bump: u8) -> Self {
        Self {
            authority,
            balance:          0,
            status:           GameStatus::Running,
            bump,
            total_deposited:  0,
            total_paid_out:   0,
            total_withdrawn:  0,
            total_spins:      0,
            total_free_spins: 0,
            total_wins:       0,
            biggest_win:      0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == GameStatus::Running
    }

    pub fn ensure_running(&self) -> Result<()> {
        require!(self.is_running(), WheelError::GameHalted);
        Ok(())
    }

    pub fn ensure_admin(&self, caller: &Pubkey) -> Result<()> {
        require_keys_eq!(*caller, self.authority, WheelError::Unauthorized);
        Ok(())
    }

    /// Deposits-minus-outflows matches the live balance.
    pub fn is_balanced(&self) -> bool {
        self.total_deposited
            .checked_sub(self.total_paid_out)
            .and_then(|net| net.checked_sub(self.total_withdrawn))
            == Some(self.balance)
    }

    // ── Credits ───────────────────────────────────────────────────

    pub fn deposit(&mut self, amount: u64) -> Result<()> {
        require!(amount > 0, WheelError::AmountTooSmall);
        let balance = self.balance.checked_add(amount).ok_or(WheelError::ArithmeticOverflow)?;
        let deposited = self.total_deposited.checked_add(amount).ok_or(WheelError::ArithmeticOverflow)?;
        self.balance = balance;
        self.total_deposited = deposited;
        Ok(())
    }

    /// Paid-spin gate: the game must be running and the payment must be
    /// exactly one stake. Credits the stake before any tier is resolved.
    pub fn accept_stake(&mut self, payment: u64) -> Result<()> {
        self.ensure_running()?;
        require!(payment == SPIN_PRICE, WheelError::InvalidStake);
        self.deposit(payment)
    }

    /// Free-spin gate: a halted wheel answers `GameHalted` before the
    /// player's daily entitlement is looked at.
    pub fn admit_free_spin(&self, record: &mut PlayerRecord, today: i64) -> Result<()> {
        self.ensure_running()?;
        record.claim_free_spin(today)
    }

    /// Read-side view of the same gate. `None` is a player who has never spun.
    pub fn free_spin_open(&self, record: Option<&PlayerRecord>, today: i64) -> bool {
        self.is_running() && record.map_or(true, |r| r.free_spin_available(today))
    }

    // ── Settlement ────────────────────────────────────────────────

    /// Payout owed for `tier` against the current balance. Fixed tiers are
    /// capped at the balance; the jackpot is a share of it. `None` on overflow.
    pub fn payout_for(&self, tier: u8) -> Option<u64> {
        if tier == JACKPOT_TIER {
            return self.jackpot_amount();
        }
        let fixed = *TIER_PAYOUTS.get(usize::from(tier))?;
        Some(fixed.min(self.balance))
    }

    pub fn jackpot_amount(&self) -> Option<u64> {
        bps_share(self.balance, JACKPOT_BPS)
    }

    /// Resolves `roll` to a tier and debits the payout in one step.
    /// Any arithmetic fault settles as tier 0 with nothing paid.
    pub fn settle(&mut self, roll: u64, is_free: bool) -> Settlement {
        let seq = self.total_spins;
        let drawn = tier_for_roll(roll);
        let (tier, amount) = self
            .payout_for(drawn)
            .and_then(|amount| self.debit_payout(amount).map(|_| (drawn, amount)))
            .unwrap_or((0, 0));

        self.total_spins = self.total_spins.wrapping_add(1);
        if is_free {
            self.total_free_spins = self.total_free_spins.wrapping_add(1);
        }
        if amount > 0 {
            self.total_wins = self.total_wins.wrapping_add(1);
            self.biggest_win = self.biggest_win.max(amount);
        }
        Settlement { seq, tier, amount }
    }

    fn debit_payout(&mut self, amount: u64) -> Option<()> {
        let balance = self.balance.checked_sub(amount)?;
        let paid_out = self.total_paid_out.checked_add(amount)?;
        self.balance = balance;
        self.total_paid_out = paid_out;
        Some(())
    }

    // ── Administration ────────────────────────────────────────────

    /// Skims `fraction_bps` of the balance. Allowed whether running or not.
    pub fn withdraw_fraction(&mut self, caller: &Pubkey, fraction_bps: u16) -> Result<u64> {
        self.ensure_admin(caller)?;
        require!(
            fraction_bps > 0 && fraction_bps <= MAX_SKIM_BPS,
            WheelError::InvalidFraction
        );
        let amount = bps_share(self.balance, u64::from(fraction_bps))
            .ok_or(WheelError::ArithmeticOverflow)?;
        self.withdraw(amount)?;
        Ok(amount)
    }

    pub fn halt(&mut self, caller: &Pubkey) -> Result<()> {
        self.ensure_admin(caller)?;
        require!(self.is_running(), WheelError::AlreadyHalted);
        self.status = GameStatus::Stopped;
        Ok(())
    }

    /// Empties the pool. Only reachable after `halt`.
    pub fn withdraw_all(&mut self, caller: &Pubkey) -> Result<u64> {
        self.ensure_admin(caller)?;
        require!(!self.is_running(), WheelError::NotHalted);
        let amount = self.balance;
        self.withdraw(amount)?;
        Ok(amount)
    }

    fn withdraw(&mut self, amount: u64) -> Result<()> {
        let balance = self.balance.checked_sub(amount).ok_or(WheelError::ArithmeticOverflow)?;
        let withdrawn = self.total_withdrawn.checked_add(amount).ok_or(WheelError::ArithmeticOverflow)?;
        self.balance = balance;
        self.total_withdrawn = withdrawn;
        Ok(())
    }
}

/// `amount × bps / 10000`, computed in u128.
pub fn bps_share(amount: u64, bps: u64) -> Option<u64> {
    let scaled = u128::from(amount).checked_mul(u128::from(bps))?;
    u64::try_from(scaled / u128::from(BPS_DENOMINATOR)).ok()
}

// ══════════════════════════════════════════════════════════════════════════
//  PLAYERS
// ══════════════════════════════════════════════════════════════════════════

#[account]
pub struct PlayerRecord {
    pub player:             Pubkey,       // 32
    pub last_free_spin_day: Option<i64>,  // 1 + 8
    pub spins:              u64,          // 8
    pub wins:               u64,          // 8
    pub total_won:          u64,          // 8
    pub bump:               u8,           // 1
}
impl PlayerRecord { pub const LEN: usize = 32 + 9 + 8 + 8 + 8 + 1; }

impl PlayerRecord {
    /// Ties a freshly created record to its owner; rejects a record that
    /// belongs to someone else.
    pub fn bind(&mut self, player: Pubkey, bump: u8) -> Result<()> {
        if self.player == Pubkey::default() {
            self.player = player;
            self.bump = bump;
        }
        require_keys_eq!(self.player, player, WheelError::PlayerMismatch);
        Ok(())
    }

    pub fn free_spin_available(&self, today: i64) -> bool {
        self.last_free_spin_day.map_or(true, |day| today > day)
    }

    pub fn claim_free_spin(&mut self, today: i64) -> Result<()> {
        require!(self.free_spin_available(today), WheelError::EligibilityDenied);
        self.last_free_spin_day = Some(today);
        Ok(())
    }

    pub fn record_result(&mut self, amount: u64) {
        self.spins = self.spins.wrapping_add(1);
        if amount > 0 {
            self.wins = self.wins.wrapping_add(1);
            self.total_won = self.total_won.saturating_add(amount);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
//  RESULT HISTORY
// ══════════════════════════════════════════════════════════════════════════

/// Immutable record of one settled spin at `["spin", seq]`.
#[account]
pub struct SpinRecord {
    pub seq:            u64,       // 8
    pub player:         Pubkey,    // 32
    pub is_free:        bool,      // 1
    pub tier:           u8,        // 1
    pub amount:         u64,       // 8
    pub message:        String,    // 4 + MAX_MESSAGE_LEN
    pub slot:           u64,       // 8
    pub unix_timestamp: i64,       // 8
    pub entropy:        [u8; 32],  // 32
    pub bump:           u8,        // 1
}
impl SpinRecord { pub const LEN: usize = 8 + 32 + 1 + 1 + 8 + (4 + MAX_MESSAGE_LEN) + 8 + 8 + 32 + 1; }
