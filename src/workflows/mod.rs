//! Domain workflows: the adoption and interview state machines, the
//! notification protocol, and the orchestration that keeps them and the
//! pet registry eventually consistent.

pub mod adoption;
pub mod clients;
pub mod ids;
pub mod interview;
pub mod notify;
pub mod orchestration;
