pub mod block;
pub mod consts;
pub mod missed;
pub mod primitives;
pub mod validator;
pub mod watched_set;
pub mod window;

pub use block::{
    Block, ExecutionAddress, ExecutionPayload, IncludedAttestation, ProposerDuty, RelayPayload,
};
pub use missed::MissedIndexBuffer;
pub use primitives::{Epoch, Gwei, Pubkey, Slot, UnixSeconds, ValidatorIndex};
pub use validator::{ValidatorRecord, ValidatorStatus};
pub use watched_set::WatchedSet;
pub use window::EpochWindow;
