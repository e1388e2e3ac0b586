// src/proposal/mod.rs

pub mod assembler;
pub mod operation;
pub mod registry;
pub mod selection;

pub use assembler::{assemble, DomainResolver, Proposal};
pub use operation::{
    ChangeSet, CreatePayload, DraftOperation, EntityKind, Operation, OperationAction,
    OperationKind,
};
pub use registry::{PendingProposal, ProposalRegistry, RegistryError};
pub use selection::SelectionSet;
