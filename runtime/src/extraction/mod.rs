//! Markup-to-record heuristics shared by every portal.

pub mod case_details;
pub mod cause_list;
pub mod dates;
