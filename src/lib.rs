//! fairedge: provably-fair casino outcome engine.
//!
//! Deterministic commit-reveal outcome generation (SHA-256 over
//! server seed, client seed, and a per-user nonce), per-game resolvers with
//! a configurable house edge, session state machines with conditional
//! updates, and a balance ledger that debits bets atomically with session
//! creation. The HTTP surface, authentication, and durable storage are
//! external collaborators behind the `store` traits and `api` types.

pub mod api;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fairness;
pub mod games;
pub mod ledger;
pub mod ratelimit;
pub mod store;

pub use api::{Action, ActionRequest, ActionResponse, OutcomeView};
pub use config::EngineConfig;
pub use engine::{ActionOutcome, GameEngine, SeedReveal};
pub use errors::{EngineError, ErrorBody};
pub use games::{CrashStatus, GameSession, GameType, MinesStatus, Outcome};
pub use ledger::{LedgerEntry, LedgerEntryKind, LedgerGuard};
pub use store::{BalanceStore, MemoryStore, SessionStore, StoreError};

/// Initialize a tracing subscriber honoring `RUST_LOG`. For test binaries
/// and embedding hosts; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
