//! Squad orchestration.
//!
//! A squad is one batch of members, each a role plus a task. The orchestrator
//! resolves every role up front, then runs each member's pipeline:
//!
//! ```text
//! role -> prompt -> escape -> [mint handle] -> render run template -> sh -c -> status
//! ```
//!
//! Members run one at a time or all at once depending on
//! [`resolve_concurrency`]. Results always come back in request order.

mod orchestrator;
mod policy;
mod types;


pub use orchestrator::SquadOrchestrator;
pub use policy::{resolve_concurrency, resolve_working_directory};
pub use types::{
    MemberRequest, MemberResult, MemberStatus, SquadRequest, SquadResponse, member_id,
};
