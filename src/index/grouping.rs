//! Decoder assignment, flattening and grouping
//!
//! After every simple leaf has a decoder, each AND/OR node is restructured
//! so that as many children as possible sit under one subtree claimed by a
//! single index: same-decoder children of the same list type are spliced
//! into their parent (flatten), and children sharing a decoder are gathered
//! into a new or existing sub-list (group).
//!
//! Only nesting changes. Leaves are moved, never copied or dropped, and the
//! boolean meaning of the tree is preserved.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::trace;

use crate::filter::{Filter, FilterChoice, FilterKind};

use super::decoder::{DecoderChain, IndexEntry};
use super::registry::RegistryState;

/// A filter with decoders assigned. Dropping it clears every decoder slot.
#[derive(Debug)]
pub struct AssignedFilter<'f> {
    filter: &'f mut Filter,
}

impl<'f> AssignedFilter<'f> {
    pub(crate) fn new(filter: &'f mut Filter) -> Self {
        Self { filter }
    }

    /// Releases the decoders now.
    pub fn release(self) {}
}

impl Deref for AssignedFilter<'_> {
    type Target = Filter;

    fn deref(&self) -> &Filter {
        self.filter
    }
}

impl DerefMut for AssignedFilter<'_> {
    fn deref_mut(&mut self) -> &mut Filter {
        self.filter
    }
}

impl Drop for AssignedFilter<'_> {
    fn drop(&mut self) {
        self.filter.release_decoders();
    }
}

/// Post-order assignment: children first, then the list node is grouped.
pub(crate) fn assign_decoders(state: &RegistryState, filter: &mut Filter) {
    match filter.choice() {
        FilterChoice::And | FilterChoice::Or => {
            filter.decoders_mut().clear();
            if let Some(children) = filter.children_mut() {
                for child in children.iter_mut() {
                    assign_decoders(state, child);
                }
            }
            group_decoders(filter);
        }
        FilterChoice::Not => {
            let inherited = match filter.kind_mut() {
                FilterKind::Not(child) => {
                    assign_decoders(state, child);
                    child.decoders().clone()
                }
                _ => DecoderChain::new(),
            };
            filter.set_decoders(inherited);
        }
        _ => state.assign_decoder(filter),
    }
}

/// Splices every child that has the parent's list type and the parent's
/// decoder (both unassigned counts as the same) into the parent, keeping
/// order. Spliced children are re-examined, so the result is fully flat.
pub fn flatten_filter(filter: &mut Filter) {
    let choice = filter.choice();
    if !choice.is_list() {
        return;
    }
    let mut index = 0;
    while index < filter.children().len() {
        let child = &filter.children()[index];
        if child.choice() == choice && child.decoders().same_decoder(filter.decoders()) {
            filter.splice_children_into(index);
        } else {
            index += 1;
        }
    }
}

/// Groups the children of a list node by decoder.
///
/// If every child can be served by the first assigned decoder, the node
/// itself takes that decoder. Otherwise, with more than two children,
/// children sharing a decoder are gathered under one sub-list.
pub(crate) fn group_decoders(filter: &mut Filter) {
    if !filter.choice().is_list() {
        return;
    }
    filter.decoders_mut().clear();
    flatten_filter(filter);

    let Some(candidate) = filter
        .children()
        .iter()
        .find(|f| f.has_decoder())
        .map(|f| f.decoders().clone())
    else {
        return;
    };

    if whole_filter_matches(filter.children(), &candidate) {
        filter.set_decoders(candidate);
        flatten_filter(filter);
        trace!(filter = %filter, "whole list claimed by one decoder");
        return;
    }

    if filter.children().len() > 2 {
        regroup(filter);
    }
}

fn whole_filter_matches(children: &[Filter], candidate: &DecoderChain) -> bool {
    let Some(primary) = candidate.primary() else {
        return false;
    };
    children.iter().all(|f| {
        f.decoders().same_decoder(candidate) || (f.is_simple() && primary.matches_associated(f))
    })
}

fn groupable(f: &Filter, decoder: &DecoderChain, primary: &IndexEntry, choice: FilterChoice) -> bool {
    match f.choice() {
        FilterChoice::Not => false,
        FilterChoice::And | FilterChoice::Or => {
            f.choice() == choice && f.decoders().same_decoder(decoder)
        }
        _ => f.decoders().same_decoder(decoder) || primary.matches_associated(f),
    }
}

/// Partial grouping: walks children left to right; for each decoder not
/// yet handled, moves every groupable child into one same-type sub-list
/// (an existing one with that decoder, or a new one placed where the first
/// member stood).
fn regroup(filter: &mut Filter) {
    let choice = filter.choice();
    let mut position = 0;
    while position < filter.children().len() {
        let lead = &filter.children()[position];
        if !lead.has_decoder() || lead.choice() == FilterChoice::Not {
            position += 1;
            continue;
        }
        let decoder = lead.decoders().clone();
        let Some(primary) = decoder.primary().map(Arc::clone) else {
            position += 1;
            continue;
        };

        let children = filter.children();
        let members: Vec<usize> = (0..children.len())
            .filter(|&i| groupable(&children[i], &decoder, &primary, choice))
            .collect();
        if members.len() < 2 || members.len() == children.len() {
            position += 1;
            continue;
        }

        let container = members.iter().copied().find(|&i| {
            children[i].choice() == choice && children[i].decoders().same_decoder(&decoder)
        });
        let group_at = match container {
            Some(container) => absorb_into(filter, container, &members),
            None => group_into_new(filter, choice, decoder, &members),
        };
        position = group_at.max(position) + 1;
    }
}

/// Moves `members` (ascending indices, including `container`) into the
/// existing sub-list at `container`. Returns the container's new index.
fn absorb_into(filter: &mut Filter, container: usize, members: &[usize]) -> usize {
    let mut moved = Vec::with_capacity(members.len() - 1);
    for &i in members.iter().rev() {
        if i != container {
            moved.push(filter.detach_child(i));
        }
    }
    moved.reverse();

    let target_index = container - members.iter().filter(|&&i| i < container).count();
    let Some(target) = filter.child_mut(target_index) else {
        panic!("regroup: container {} vanished", target_index);
    };
    for child in moved {
        target.push_child(child);
    }
    flatten_filter(target);
    trace!(filter = %target, "grouped into existing sub-list");
    target_index
}

/// Moves `members` into a new sub-list at the first member's position.
fn group_into_new(
    filter: &mut Filter,
    choice: FilterChoice,
    decoder: DecoderChain,
    members: &[usize],
) -> usize {
    let first = members[0];
    let mut moved: Vec<Filter> = members.iter().rev().map(|&i| filter.detach_child(i)).collect();
    moved.reverse();

    let mut group = Filter::list(choice, moved);
    group.set_decoders(decoder);
    flatten_filter(&mut group);
    trace!(filter = %group, "grouped into new sub-list");
    filter.insert_child(first, group);
    first
}
