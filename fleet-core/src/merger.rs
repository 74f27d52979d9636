//! Cross-block merger: stitches the tail of one block's
//! chains onto the head of the next block's chains when feasible,
//! reducing bus count by reusing a bus across a morning/afternoon pair.

use crate::config::ChainConfig;
use crate::matching::{max_weight_matching, BipartiteEdge};
use crate::model::Chain;
use fleet_heuristics::Float;

/// Attempts to merge `tails` (chains ending a block) with `heads` (chains
/// starting the next block) via maximum-weight bipartite matching.
/// `travel(tail_chain, head_chain)` must return `None` for infeasible
/// pairs and `Some(minutes)` otherwise; ties are broken by the caller
/// presenting `tails`/`heads` in a stable, already-tie-broken order
/// (smallest idle gap, then lowest deadhead, then lexicographic chain id),
/// since matching itself only maximizes total weight.
pub fn merge_adjacent_blocks(
    tails: Vec<Chain>,
    heads: Vec<Chain>,
    cfg: &ChainConfig,
    mut travel: impl FnMut(&Chain, &Chain) -> Option<Float>,
) -> Vec<Chain> {
    if tails.is_empty() || heads.is_empty() {
        return tails.into_iter().chain(heads).collect();
    }

    let mut edges = Vec::new();
    for (t_idx, tail) in tails.iter().enumerate() {
        for (h_idx, head) in heads.iter().enumerate() {
            if let Some(minutes) = travel(tail, head) {
                let idle_gap = idle_gap_minutes(tail, head);
                if idle_gap < 0.0 {
                    continue; // head starts before tail's bus is free.
                }
                let weight = cfg.large_weight - minutes - idle_gap * 0.01;
                edges.push(BipartiteEdge { left: t_idx, right: h_idx, weight });
            }
        }
    }

    let matching = max_weight_matching(tails.len(), heads.len(), &edges);

    let mut merged_tail = vec![false; tails.len()];
    let mut merged_head = vec![false; heads.len()];
    let mut output: Vec<Chain> = Vec::with_capacity(tails.len().max(heads.len()));

    let mut tails = tails;
    let mut heads: Vec<Option<Chain>> = heads.into_iter().map(Some).collect();

    for &(t_idx, h_idx) in &matching.pairs {
        merged_tail[t_idx] = true;
        merged_head[h_idx] = true;
        let mut combined = std::mem::replace(
            &mut tails[t_idx],
            Chain { jobs: Vec::new(), shifts: Vec::new() },
        );
        if let Some(head) = heads[h_idx].take() {
            combined.jobs.extend(head.jobs);
            combined.shifts.extend(head.shifts);
        }
        output.push(combined);
    }

    for (idx, tail) in tails.into_iter().enumerate() {
        if !merged_tail[idx] {
            output.push(tail);
        }
    }
    for (idx, head) in heads.into_iter().enumerate() {
        if !merged_head[idx] {
            if let Some(head) = head {
                output.push(head);
            }
        }
    }

    output
}

/// Idle gap between a tail chain's last job ending and a head chain's
/// first job anchor, ignoring travel.
fn idle_gap_minutes(tail: &Chain, head: &Chain) -> Float {
    let tail_end = tail.end_time().unwrap_or(0.0);
    let head_start = head.start_anchor().unwrap_or(0.0);
    head_start - tail_end
}

#[cfg(test)]
#[path = "../tests/unit/merger_test.rs"]
mod merger_test;
