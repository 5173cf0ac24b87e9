mod code;
mod credential;
mod lease;
mod slot;

pub use code::{CodeUse, CreateCode, RedemptionCode};
pub use credential::{Credential, OwnerSet};
pub use lease::{Lease, MailWindow, PlatformFeatures};
pub use slot::{LabelMode, Slot, SlotDuration};
