//! System-wide constants for the SealedPool escrow ledger.

/// EIP-712 domain name shared by the pool and every operator.
pub const DOMAIN_NAME: &str = "SealedArtMarket";

/// EIP-712 domain version.
pub const DOMAIN_VERSION: &str = "1";

/// Default chain id (local development node).
pub const DEFAULT_CHAIN_ID: u64 = 31_337;

/// Seconds in one day.
pub const DAY_SECS: u64 = 24 * 3600;

/// Delay between `start_withdrawal` and the earliest successful
/// `execute_pending_withdrawal`. Elapsed time must strictly exceed it.
pub const DEFAULT_WITHDRAWAL_DELAY_SECS: u64 = 7 * DAY_SECS;

/// Basis-point denominator for protocol fees.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Highest protocol fee an operator owner may configure (10%).
pub const MAX_PROTOCOL_FEE_BPS: u64 = 1_000;

/// Default protocol fee charged by operators (2.5%).
pub const DEFAULT_PROTOCOL_FEE_BPS: u64 = 250;

/// Tag mixed into the sealed funding init-code hash.
pub const SEALED_FUNDING_CODE_TAG: &[u8] = b"sealedpool:sealed_funding:v1";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
