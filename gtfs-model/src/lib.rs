/*! Records of a [General Transit Feed Specification](https://gtfs.org/) (GTFS) feed, as a validator sees them.

A Gtfs feed is a collection of CSV files (often bundled as a zip file).
Each file represents a collection of one type (stops, lines, etc.) that have relationships through unique identifiers.

## Design decisions

### Rows before records

[FeedSource] only yields [DataRow]s: the header, the raw values and the [SourceRef] of each line.
A validator must report a malformed value and keep going, so the conversion into records
(and the reporting) is left to the caller instead of failing the whole file like a serde deserialization would.

### Interned identifiers

Identifiers are [Id]s interned by an [IdCache] owned by whoever loads the feed. There is no global state,
two loads never share identifiers.

### Use of Enum

Many values are integers that are actually enumerations of certain values. We always use Rust enums, like [LocationType] to represent them, and not the integer value.
Out of range values are kept (e.g. [LocationType::Unknown]) so that they can be reported.

### Renaming

We kept some names even if they can be confusing (a [Calendar] will be referenced by `service_id`), but we strip the object type (`route_short_name` is [Route::short_name]).
*/
#![warn(missing_docs)]

#[macro_use]
extern crate derivative;

mod enums;
pub mod error;
pub mod fields;
pub mod ids;
pub(crate) mod objects;
pub mod reader;
pub mod source;

#[cfg(test)]
mod tests;

pub use error::Error;
pub use fields::LogicalTime;
pub use ids::{Id, IdCache};
pub use objects::*;
pub use reader::{DataRow, FeedSource, TableRows, KNOWN_TABLES};
pub use source::{SourceContext, SourceInfo, SourceRef, TableHeaders};
