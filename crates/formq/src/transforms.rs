// ai
//! 🔄 Transforms — the Rosetta Stone between "what the form said" and "what the spreadsheet wants" 🎭
//!
//! 🎬 COLD OPEN — INT. FORMS PLATFORM EXPORT — 2:47 AM
//!
//! A submission arrives. Its answers are strings, lists, stringified lists, tables of
//! sub-answers, and one timestamp with a timezone nobody asked for. On the other side of
//! this module waits a flat row with tidy column names. In between: us.
//!
//! ## Architecture 📐
//!
//! ```text
//!   RawSubmission                                NormalizedRecord
//!  ┌──────────────┐    ┌───────────────────┐    ┌──────────────────┐
//!  │ data{...}    │───▶│ value::normalize  │───▶│ column → value   │
//!  │  ├ flat      │    │  └ literal::parse │    │ ...              │
//!  │  └ nested{}  │    └───────────────────┘    │ Serial number    │
//!  │ entity{...}  │───▶ datetime::extract  ────▶│ Oprettet         │
//!  └──────────────┘                             │ Gennemført       │
//!                                               └──────────────────┘
//! ```
//!
//! ## Knowledge Graph 🧠
//! - Depends on: `common::{RawSubmission, FieldMapping, NormalizedRecord}`
//! - Used by: `window` (timestamp parsing), `supervisors` (per-submission transform),
//!   `common` (entity lookups)
//! - Parse failures never escape: `ParseError` is converted into a fallback or a `None`
//!   right where it happens. Data completeness over strictness.

pub(crate) mod datetime;
pub(crate) mod literal;
pub(crate) mod submission;
pub(crate) mod value;

pub(crate) use datetime::{entity_value, parse_timestamp};
pub(crate) use submission::transform;
