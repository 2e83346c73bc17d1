//! Preview layer: the per-file session and grammar navigation.
//!
//! [`PreviewSession`] drives compile and parse from editor events and
//! publishes snapshots; [`PreviewView`] answers cursor queries against one
//! snapshot, using [`RegionIndex`] to map automaton states back to grammar
//! text.

mod region_index;
mod session;

pub use region_index::{RegionIndex, SourceToken};
pub use session::{
    EnclosingNode, GrammarLocation, GrammarStatus, LoadedGrammar, ParseRegion, ParseStatus,
    PreviewSession, PreviewView, SessionEvent,
};
