//! Placement plan to wire command codec.
//!
//! A [`PlacementPlan`] lists, for each of the four cells, the actions its
//! seat module should perform. [`encode`] folds each cell's actions into a
//! four digit code and concatenates them into a 16 digit [`EncodedCommand`],
//! cell 1 first.
//!
//! # Action table
//!
//! | token | code |
//! |---|---|
//! | `unchanged` | 0000 |
//! | `disk_rotate(0)` / `disk_rotate(90)` | 0000 / 0010 |
//! | `move_on_rail('M')` / `('A')` / `('C')` | 0000 / 0100 / 0200 |
//! | `seat_rotate(0)` / `(90)` / `(180)` / `(270)` | 0000 / 1000 / 2000 / 3000 |
//! | `unfold` | 0000, and subtracts one from the cell total |
//! | `fold` | 0001 |
//!
//! A cell's code is the sum of its action codes minus the number of
//! `unfold` actions. The controllers decode this arithmetic, so it must not
//! change.
//!
//! # Example
//!
//! ```
//! use seatplan::codec::{encode, CellId, PlacementPlan};
//!
//! let plan = PlacementPlan::from_json_str(r#"{"1": ["seat_rotate(90)"]}"#).unwrap();
//! assert_eq!(encode(&plan).unwrap().as_str(), "1000000000000000");
//! ```

mod command;
mod encode;
mod error;
mod extract;
mod plan;
mod token;

pub use command::{EncodedCommand, CHUNK_WIDTH, COMMAND_WIDTH};
pub use encode::{encode, encode_cell, encode_reply};
pub use error::CodecError;
pub use extract::extract_json_text;
pub use plan::{CellId, PlacementPlan, CELL_COUNT};
pub use token::{ActionToken, DiskAngle, RailPosition, SeatAngle, TokenParam};
