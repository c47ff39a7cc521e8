//! Ledger data model and block acceptance.
//!
//! - `Transaction`: UTXO-style inputs and outputs, signed per input
//! - `Block`/`Header`: signed header committing to its transactions through a merkle root
//! - `HeaderList`: append-only header chain indexed by height
//! - `Ledger`: validates blocks against the tip and commits them to the stores

pub mod block;
pub mod header_list;
pub mod ledger;
pub mod transaction;
