// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Map global memory addresses to the node that owns them.
//!
//! Each node owns one contiguous range of addresses. All ranges have the same
//! power-of-two length and are aligned to it, so that the owner of an address
//! is found by indexing a table with the address block index
//! (`address >> offset_bits`).

use std::collections::BTreeMap;
use std::fmt;

use fabric_engine::sim_error;
use fabric_engine::types::SimError;

use crate::packet::NodeId;

/// Largest number of address blocks the table is allowed to span.
pub const MAX_ADDRESS_BLOCKS: u64 = 1 << 20;

/// Inclusive range of addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    pub begin: u64,
    pub end: u64,
}

impl AddressRange {
    #[must_use]
    pub fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    /// Number of addresses in the range, `None` if the range is empty or
    /// covers the whole address space.
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        if self.end < self.begin {
            return None;
        }
        (self.end - self.begin).checked_add(1)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.begin, self.end)
    }
}

#[derive(Debug)]
pub struct AddressRoutingTable {
    offset_bits: u32,
    lut: Vec<Option<NodeId>>,
}

impl AddressRoutingTable {
    /// Build and validate the table.
    ///
    /// Fails if any range length is not a power of two, if the lengths differ,
    /// if a range is not aligned to its length or if two ranges overlap.
    pub fn build(ranges: &BTreeMap<NodeId, AddressRange>) -> Result<Self, SimError> {
        if ranges.is_empty() {
            return sim_error!("no address ranges configured");
        }

        let mut offset_bits: Option<u32> = None;
        let mut blocks = Vec::with_capacity(ranges.len());
        for (node, range) in ranges {
            let Some(length) = range.length() else {
                return sim_error!(format!("address range {range} of node {node} is invalid"));
            };
            if !length.is_power_of_two() {
                return sim_error!(format!(
                    "address range {range} of node {node}: {length} is not a power of 2"
                ));
            }

            let bits = length.trailing_zeros();
            match offset_bits {
                None => offset_bits = Some(bits),
                Some(expected) if expected != bits => {
                    return sim_error!(format!(
                        "address range {range} of node {node} has length {length}, expected {}",
                        1_u64 << expected
                    ));
                }
                Some(_) => {}
            }

            if range.begin % length != 0 {
                return sim_error!(format!(
                    "address range {range} of node {node} is not aligned to its length"
                ));
            }
            blocks.push((range.begin >> bits, *node, *range));
        }

        let Some(offset_bits) = offset_bits else {
            return sim_error!("no address ranges configured");
        };
        let num_blocks = blocks.iter().map(|(index, _, _)| index + 1).max().unwrap_or(0);
        if num_blocks > MAX_ADDRESS_BLOCKS {
            return sim_error!(format!(
                "address map spans {num_blocks} blocks, at most {MAX_ADDRESS_BLOCKS} supported"
            ));
        }

        let mut lut = vec![None; num_blocks as usize];
        for (index, node, range) in blocks {
            let slot = &mut lut[index as usize];
            if let Some(owner) = *slot {
                return sim_error!(format!(
                    "address range {range} of node {node} overlaps with node {owner}"
                ));
            }
            *slot = Some(node);
        }

        Ok(Self { offset_bits, lut })
    }

    /// The node that owns `address`, if any.
    #[must_use]
    pub fn resolve(&self, address: u64) -> Option<NodeId> {
        let index = address >> self.offset_bits;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.lut.get(i).copied().flatten())
    }

    #[must_use]
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// The nodes that own at least one block.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.lut.iter().filter_map(|n| *n)
    }
}
