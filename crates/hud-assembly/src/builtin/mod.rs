// SPDX-License-Identifier: MIT
//! Built-in content generators, independent of the game system.

pub mod compendium;
pub mod macros;
pub mod utility;

pub use compendium::{CompendiumEntry, CompendiumGenerator, CompendiumPack, CompendiumSource};
pub use macros::{MACRO_GROUP_ID, MacroGenerator, MacroRecord, MacroSource};
pub use utility::{UTILITY_GROUP_ID, UtilityGenerator};
