//! Fragment loading and assembly for manualkit.
//!
//! Reads the ordered list of XML fragments that make up one technical manual,
//! parses each into an owned element tree, and assembles them into a single
//! [`Document`] of numbered sections together with the [`CrossReferenceMap`]
//! that later resolves links between fragments.

pub mod assembler;
pub mod inventory;
pub mod order;
pub mod xml;
pub mod xref;

pub use assembler::{
    AssembleResult, DirSource, Document, FragmentAssembler, FragmentError, FragmentSource,
    MemorySource, Section,
};
pub use inventory::{TagInventory, tag_inventory};
pub use order::{FragmentRef, extract_xml_link, parse_order_list, read_order_list};
pub use xml::{Element, Node};
pub use xref::{CrossRefEntry, CrossReferenceMap, GENERIC_LABEL};
