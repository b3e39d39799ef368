use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{get_stack_height, TRANSACTION_LEVEL_STACK_HEIGHT};
use anchor_lang::solana_program::native_token::LAMPORTS_PER_SOL;
use anchor_lang::solana_program::sysvar::instructions::{
    self as ix_sysvar, load_current_index_checked, load_instruction_at_checked,
};
use anchor_lang::solana_program::sysvar::slot_hashes;
use anchor_lang::solana_program::system_instruction;
use anchor_lang::solana_program::program::invoke;

pub mod constants;
pub mod state;


pub use constants::*;
pub use state::*;

declare_id!("DLfjLeuufjSzyQ1FkhnE83rpdYbydTGKnrfPGtiNBdeN");

#[cfg(not(feature = "no-entrypoint"))]
use solana_security_txt::security_txt;

#[cfg(not(feature = "no-entrypoint"))]
security_txt! {
    name: "Based Wheel",
    project_url: "https://basedwheel.app",
    contacts: "email:security@basedwheel.app",
    policy: "https://basedwheel.app/security",
    preferred_languages: "en",
    auditors: "Unaudited"
}

#[program]
pub mod based_wheel {
    use super::*;

    // ── Initialize (signer becomes the permanent administrator) ───
    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        let authority = ctx.accounts.authority.key();
        ctx.accounts.pool.set_inner(WheelPool::new(authority, ctx.bumps.pool));
        emit!(PoolInitialized { authority });
        Ok(())
    }

    // ── Fund the pool (anyone can add liquidity) ──────────────────
    pub fn fund_pool(ctx: Context<FundPool>, amount: u64) -> Result<()> {
        require!(amount > 0, WheelError::AmountTooSmall);
        transfer_in(&ctx.accounts.funder, &ctx.accounts.pool, amount)?;

        let pool = &mut ctx.accounts.pool;
        pool.deposit(amount)?;
        ensure_solvent(pool)?;
        emit!(PoolFunded { funder: ctx.accounts.funder.key(), amount, balance: pool.balance });
        Ok(())
    }

    // ── Free spin: once per UTC calendar day per player ───────────
    pub fn request_free_spin(ctx: Context<Spin>) -> Result<()> {
        guard_spin_transaction(&ctx.accounts.instructions)?;
        let clock = Clock::get()?;
        let today = calendar_day(clock.unix_timestamp);

        let player_key = ctx.accounts.player.key();
        let record = &mut ctx.accounts.player_record;
        record.bind(player_key, ctx.bumps.player_record)?;
        ctx.accounts.pool.admit_free_spin(record, today)?;

        settle_spin(ctx, true, &clock)
    }

    // ── Paid spin: exactly SPIN_PRICE, captured before resolution ─
    pub fn request_paid_spin(ctx: Context<Spin>, payment: u64) -> Result<()> {
        guard_spin_transaction(&ctx.accounts.instructions)?;
        let clock = Clock::get()?;
        let player_key = ctx.accounts.player.key();
        ctx.accounts.player_record.bind(player_key, ctx.bumps.player_record)?;

        ctx.accounts.pool.accept_stake(payment)?;
        transfer_in(&ctx.accounts.player, &ctx.accounts.pool, payment)?;

        settle_spin(ctx, false, &clock)
    }

    // ── Views (return data) ───────────────────────────────────────
    pub fn get_pool_balance(ctx: Context<ReadPool>) -> Result<u64> {
        Ok(ctx.accounts.pool.balance)
    }

    pub fn get_jackpot_amount(ctx: Context<ReadPool>) -> Result<u64> {
        let amount = ctx.accounts.pool.jackpot_amount().ok_or(WheelError::ArithmeticOverflow)?;
        Ok(amount)
    }

    pub fn is_free_spin_available(ctx: Context<ReadPlayer>) -> Result<bool> {
        let today = calendar_day(Clock::get()?.unix_timestamp);
        let record = ctx.accounts.player_record.as_deref();
        Ok(ctx.accounts.pool.free_spin_open(record, today))
    }

    // ── Admin: Skim a share of the pool ───────────────────────────
    pub fn withdraw_fraction(ctx: Context<AdminOnly>, fraction_bps: u16) -> Result<()> {
        let authority = ctx.accounts.authority.key();
        let pool = &mut ctx.accounts.pool;
        let amount = pool.withdraw_fraction(&authority, fraction_bps)?;

        pay_out(&pool.to_account_info(), &ctx.accounts.authority.to_account_info(), amount)?;
        ensure_solvent(pool)?;
        emit!(FractionWithdrawn { authority, fraction_bps, amount, balance: pool.balance });
        Ok(())
    }

    // ── Admin: Halt (irreversible) ────────────────────────────────
    pub fn halt(ctx: Context<AdminOnly>) -> Result<()> {
        let authority = ctx.accounts.authority.key();
        let pool = &mut ctx.accounts.pool;
        pool.halt(&authority)?;

        msg!("Wheel halted with {} lamports in pool", pool.balance);
        emit!(WheelHalted { authority, balance: pool.balance });
        Ok(())
    }

    // ── Admin: Drain after halt ───────────────────────────────────
    pub fn withdraw_all(ctx: Context<AdminOnly>) -> Result<()> {
        let authority = ctx.accounts.authority.key();
        let pool = &mut ctx.accounts.pool;
        let amount = pool.withdraw_all(&authority)?;

        pay_out(&pool.to_account_info(), &ctx.accounts.authority.to_account_info(), amount)?;
        ensure_solvent(pool)?;
        msg!("Pool drained: {} lamports", amount);
        emit!(PoolDrained { authority, amount });
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════
//  HELPERS
// ══════════════════════════════════════════════════════════════════════════

/// Shared settlement for both spin kinds. Eligibility and payment have
/// already been checked and captured by the caller.
///
/// ORDER:
///   1. Draw entropy and settle against the ledger (debit recorded)
///   2. Persist the SpinRecord and player counters
///   3. Move lamports pool → player (direct mutation, no CPI)
///   4. Verify the pool account still covers the ledger balance
///
/// Any error reverts the whole transaction, including the stake transfer.
fn settle_spin(ctx: Context<Spin>, is_free: bool, clock: &Clock) -> Result<()> {
    let player_key = ctx.accounts.player.key();
    let recent_hash = read_recent_slot_hash(&ctx.accounts.slot_hashes.to_account_info())?;

    // ── STEP 1: Ledger ───────────────────────────────────────────
    let pool = &mut ctx.accounts.pool;
    let entropy = mix_entropy(
        &recent_hash,
        clock.slot,
        clock.unix_timestamp,
        &player_key,
        pool.total_spins,
        pool.balance,
    );
    let settlement = pool.settle(roll_from_seed(&entropy), is_free);
    require!(pool.is_balanced(), WheelError::AccountingBroken);
    let message = spin_message(settlement.tier, settlement.amount, &entropy);

    // ── STEP 2: Records ──────────────────────────────────────────
    ctx.accounts.player_record.record_result(settlement.amount);
    ctx.accounts.spin_record.set_inner(SpinRecord {
        seq:            settlement.seq,
        player:         player_key,
        is_free,
        tier:           settlement.tier,
        amount:         settlement.amount,
        message:        message.clone(),
        slot:           clock.slot,
        unix_timestamp: clock.unix_timestamp,
        entropy,
        bump:           ctx.bumps.spin_record,
    });

    // ── STEP 3: Payout ───────────────────────────────────────────
    if settlement.amount > 0 {
        pay_out(
            &ctx.accounts.pool.to_account_info(),
            &ctx.accounts.player.to_account_info(),
            settlement.amount,
        )?;
    }

    // ── STEP 4: Solvency ─────────────────────────────────────────
    ensure_solvent(&ctx.accounts.pool)?;

    emit!(SpinResult {
        seq:     settlement.seq,
        player:  player_key,
        is_free,
        tier:    settlement.tier,
        amount:  settlement.amount,
        message,
    });
    Ok(())
}

/// Every input to `mix_entropy` is readable on-chain, so no other program
/// code may share the spin's transaction: not as a caller (CPI), not before
/// it (predict and abort), not after it (inspect and revert). Compute-budget
/// instructions are the one exception.
fn guard_spin_transaction(instructions_ai: &AccountInfo) -> Result<()> {
    ensure_top_level(get_stack_height())?;
    ensure_spin_stands_alone(instructions_ai)
}

fn ensure_spin_stands_alone(instructions_ai: &AccountInfo) -> Result<()> {
    let current = load_current_index_checked(instructions_ai)?;
    let count = instruction_count(&instructions_ai.try_borrow_data()?)?;
    ensure_last_instruction(current, count)?;

    for index in 0..current {
        let ix = load_instruction_at_checked(usize::from(index), instructions_ai)?;
        require_keys_eq!(ix.program_id, COMPUTE_BUDGET_PROGRAM_ID, WheelError::ForeignInstruction);
    }
    Ok(())
}

pub fn ensure_top_level(stack_height: usize) -> Result<()> {
    require!(stack_height == TRANSACTION_LEVEL_STACK_HEIGHT, WheelError::CpiNotAllowed);
    Ok(())
}

pub fn ensure_last_instruction(current_index: u16, instruction_count: u16) -> Result<()> {
    require!(
        u32::from(current_index) + 1 == u32::from(instruction_count),
        WheelError::TrailingInstruction
    );
    Ok(())
}

/// Instructions sysvar data opens with the instruction count as a u16.
fn instruction_count(data: &[u8]) -> Result<u16> {
    let bytes: [u8; 2] = data
        .get(0..2)
        .and_then(|b| b.try_into().ok())
        .ok_or(WheelError::TrailingInstruction)?;
    Ok(u16::from_le_bytes(bytes))
}

/// System transfer from a signer into the pool account.
fn transfer_in<'info>(
    from: &Signer<'info>,
    pool: &Account<'info, WheelPool>,
    amount: u64,
) -> Result<()> {
    let ix = system_instruction::transfer(&from.key(), &pool.key(), amount);
    invoke(&ix, &[from.to_account_info(), pool.to_account_info()])?;
    Ok(())
}

/// Moves lamports out of the program-owned pool. No CPI, so nothing the
/// recipient controls runs here.
fn pay_out(pool_ai: &AccountInfo, recipient: &AccountInfo, amount: u64) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    {
        let mut from = pool_ai.try_borrow_mut_lamports()?;
        **from = (**from).checked_sub(amount).ok_or(WheelError::ArithmeticOverflow)?;
    }
    let mut to = recipient.try_borrow_mut_lamports()?;
    **to = (**to).checked_add(amount).ok_or(WheelError::ArithmeticOverflow)?;
    Ok(())
}

fn ensure_solvent(pool: &Account<WheelPool>) -> Result<()> {
    let pool_ai = pool.to_account_info();
    let rent = Rent::get()?.minimum_balance(pool_ai.data_len());
    covers_balance(pool_ai.lamports(), rent, pool.balance)
}

/// Physical lamports above rent must always cover the ledger balance.
pub fn covers_balance(lamports: u64, rent_minimum: u64, balance: u64) -> Result<()> {
    let physical = lamports.saturating_sub(rent_minimum);
    require!(physical >= balance, WheelError::AccountingBroken);
    Ok(())
}

/// UTC calendar day index. Day boundaries are fixed at midnight UTC.
pub fn calendar_day(unix_timestamp: i64) -> i64 {
    unix_timestamp.div_euclid(SECONDS_PER_DAY)
}

/// Most recent entry of the SlotHashes sysvar. Layout: u64 count, then
/// (u64 slot, [u8; 32] hash) pairs, newest first.
fn read_recent_slot_hash(slot_hashes_ai: &AccountInfo) -> Result<[u8; 32]> {
    let data = slot_hashes_ai.try_borrow_data()?;
    require!(data.len() >= 8 + 40, WheelError::SlotHashNotFound);

    let mut count = [0u8; 8];
    count.copy_from_slice(&data[0..8]);
    require!(u64::from_le_bytes(count) > 0, WheelError::SlotHashNotFound);

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&data[16..48]);
    Ok(hash)
}

/// Blake3( slot_hash || slot || unix_ts || player || seq || balance ).
/// The spin sequence and balance make two spins in the same slot diverge.
pub fn mix_entropy(
    recent_slot_hash: &[u8; 32],
    slot: u64,
    unix_timestamp: i64,
    player: &Pubkey,
    seq: u64,
    balance: u64,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(recent_slot_hash);
    hasher.update(&slot.to_le_bytes());
    hasher.update(&unix_timestamp.to_le_bytes());
    hasher.update(player.as_ref());
    hasher.update(&seq.to_le_bytes());
    hasher.update(&balance.to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// First 8 bytes of the seed reduced into the roll domain.
pub fn roll_from_seed(seed: &[u8; 32]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&seed[0..8]);
    u64::from_le_bytes(bytes) % ROLL_DOMAIN
}

/// Index of the first band whose upper bound exceeds `roll`.
pub fn tier_for_roll(roll: u64) -> u8 {
    let roll = roll % ROLL_DOMAIN;
    TIER_BOUNDS
        .iter()
        .position(|&bound| roll < bound)
        .and_then(|tier| u8::try_from(tier).ok())
        .unwrap_or(0)
}

/// Tier 0 picks a motivation from byte 8 of the seed (independent of the roll
/// bytes). Win text states the amount paid, which a dry pool can cap below
/// the table payout.
pub fn spin_message(tier: u8, amount: u64, seed: &[u8; 32]) -> String {
    match (tier, amount) {
        (0, _) => MOTIVATIONS[usize::from(seed[8]) % MOTIVATIONS.len()].to_string(),
        (_, 0) => EMPTY_POOL_MESSAGE.to_string(),
        (JACKPOT_TIER, _) => JACKPOT_MESSAGE.to_string(),
        (_, paid) => format!("You won {} SOL!", format_sol(paid)),
    }
}

/// Lamports as decimal SOL without trailing zeros: 1_000_000 → "0.001".
pub fn format_sol(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let frac = lamports % LAMPORTS_PER_SOL;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:09}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

// ══════════════════════════════════════════════════════════════════════════
//  ACCOUNTS
// ══════════════════════════════════════════════════════════════════════════

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(init, payer = authority, space = 8 + WheelPool::LEN,
              seeds = [POOL_SEED], bump)]
    pub pool: Account<'info, WheelPool>,
    #[account(mut)] pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct FundPool<'info> {
    #[account(mut, seeds = [POOL_SEED], bump = pool.bump)]
    pub pool: Account<'info, WheelPool>,
    #[account(mut)] pub funder: Signer<'info>,
    pub system_program: Program<'info, System>,
}

/// Shared by free and paid spins. The player record is created on first
/// spin; the spin record lands at the pool's next sequence number.
#[derive(Accounts)]
pub struct Spin<'info> {
    #[account(mut)] pub player: Signer<'info>,
    #[account(mut, seeds = [POOL_SEED], bump = pool.bump)]
    pub pool: Account<'info, WheelPool>,
    #[account(init_if_needed, payer = player, space = 8 + PlayerRecord::LEN,
              seeds = [PLAYER_SEED, player.key().as_ref()], bump)]
    pub player_record: Account<'info, PlayerRecord>,
    #[account(init, payer = player, space = 8 + SpinRecord::LEN,
              seeds = [SPIN_SEED, pool.total_spins.to_le_bytes().as_ref()], bump)]
    pub spin_record: Account<'info, SpinRecord>,
    /// CHECK: address pinned to the SlotHashes sysvar
    #[account(address = slot_hashes::ID)]
    pub slot_hashes: UncheckedAccount<'info>,
    /// CHECK: address pinned to the Instructions sysvar
    #[account(address = ix_sysvar::ID)]
    pub instructions: UncheckedAccount<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct ReadPool<'info> {
    #[account(seeds = [POOL_SEED], bump = pool.bump)]
    pub pool: Account<'info, WheelPool>,
}

#[derive(Accounts)]
pub struct ReadPlayer<'info> {
    #[account(seeds = [POOL_SEED], bump = pool.bump)]
    pub pool: Account<'info, WheelPool>,
    /// CHECK: any wallet; only its key is used to derive the record address
    pub player: UncheckedAccount<'info>,
    /// Absent until the player's first spin.
    #[account(seeds = [PLAYER_SEED, player.key().as_ref()], bump)]
    pub player_record: Option<Account<'info, PlayerRecord>>,
}

/// Identity is checked against `pool.authority` inside each handler so a
/// wrong signer surfaces as `Unauthorized`.
#[derive(Accounts)]
pub struct AdminOnly<'info> {
    #[account(mut, seeds = [POOL_SEED], bump = pool.bump)]
    pub pool: Account<'info, WheelPool>,
    #[account(mut)] pub authority: Signer<'info>,
}

// ══════════════════════════════════════════════════════════════════════════
//  ERRORS & EVENTS
// ══════════════════════════════════════════════════════════════════════════

#[error_code]
pub enum WheelError {
    #[msg("Free spin already used today")]
    EligibilityDenied,
    #[msg("Payment must equal the spin price exactly")]
    InvalidStake,
    #[msg("Wheel is halted")]
    GameHalted,
    #[msg("Caller is not the administrator")]
    Unauthorized,
    #[msg("Wheel is already halted")]
    AlreadyHalted,
    #[msg("Wheel must be halted first")]
    NotHalted,
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
    #[msg("Fraction must be between 1 and 4000 bps")]
    InvalidFraction,
    #[msg("Amount must be greater than zero")]
    AmountTooSmall,
    #[msg("Slot hash not found")]
    SlotHashNotFound,
    #[msg("Accounting invariant violated")]
    AccountingBroken,
    #[msg("Player record belongs to another wallet")]
    PlayerMismatch,
    #[msg("Spins cannot be invoked from another program")]
    CpiNotAllowed,
    #[msg("Spin must be the last instruction in the transaction")]
    TrailingInstruction,
    #[msg("Only compute-budget instructions may precede a spin")]
    ForeignInstruction,
}

#[event] pub struct PoolInitialized   { pub authority: Pubkey }
#[event] pub struct PoolFunded        { pub funder: Pubkey, pub amount: u64, pub balance: u64 }
#[event] pub struct SpinResult        { pub seq: u64, pub player: Pubkey, pub is_free: bool, pub tier: u8, pub amount: u64, pub message: String }
#[event] pub struct FractionWithdrawn { pub authority: Pubkey, pub fraction_bps: u16, pub amount: u64, pub balance: u64 }
#[event] pub struct WheelHalted       { pub authority: Pubkey, pub balance: u64 }
#[event] pub struct PoolDrained       { pub authority: Pubkey, pub amount: u64 }
