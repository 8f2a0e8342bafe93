pub mod change_request;
pub mod item;

pub use change_request::{
    AmendmentType, ChangeProposal, ChangeRequest, ChangeRequestSummary, CrState, Disposition,
    ProposalKind,
};
pub use item::{item_path, ItemStatus, RegisterItem, Revision};
