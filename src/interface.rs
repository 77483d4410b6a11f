//! Coherent interface handling.
//!
//! Stacking faults and twin lamellae show up as thin layers of a second
//! phase (HCP inside FCC, hexagonal diamond inside cubic diamond). Across
//! such an interface the two lattices share close-packed planes, so a
//! defect-phase atom can be given an equivalent parent-phase orientation.
//! This stage grows those conversions outward from the interface, lowest
//! disorientation first, so that every bond afterwards compares atoms of a
//! single phase.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::UnitQuaternion;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::cluster::MISORIENTATION_THRESHOLD;
use crate::crystal::OrientationRemap;
use crate::engine::CancelFlag;
use crate::model::{NeighborBond, StructureType, NUM_STRUCTURE_TYPES};
use crate::{Error, Result};

/// Parent phase of each coherent phase pair, decided by majority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentPhases {
    pub close_packed: StructureType,
    pub diamond: StructureType,
}

impl ParentPhases {
    /// Majority vote over `structures`. Ties go to the cubic phase.
    pub fn vote(structures: &[StructureType]) -> Self {
        let mut counts = [0usize; NUM_STRUCTURE_TYPES];
        for s in structures {
            counts[s.index()] += 1;
        }
        let pick = |cubic: StructureType, hex: StructureType| {
            if counts[cubic.index()] >= counts[hex.index()] { cubic } else { hex }
        };
        Self {
            close_packed: pick(StructureType::Fcc, StructureType::Hcp),
            diamond: pick(StructureType::CubicDiamond, StructureType::HexDiamond),
        }
    }

    pub fn is_parent(&self, s: StructureType) -> bool {
        s == self.close_packed || s == self.diamond
    }

    /// The phase `s` is converted into, if `s` is a defect phase.
    pub fn target(&self, s: StructureType) -> Option<StructureType> {
        let partner = s.interface_partner()?;
        (self.is_parent(partner) && !self.is_parent(s)).then_some(partner)
    }
}

// Min-heap entry: lowest disorientation first, then insertion order.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    disorientation: f64,
    seq: u64,
    parent: usize,
    defect: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .disorientation
            .total_cmp(&self.disorientation)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority-driven conversion of defect-phase atoms into the parent phase.
pub struct InterfaceHandler<'r, R: OrientationRemap + ?Sized> {
    remap: &'r R,
    phases: ParentPhases,
    heap: BinaryHeap<Candidate>,
    seq: u64,
    remap_failures: usize,
}

impl<'r, R: OrientationRemap + ?Sized> InterfaceHandler<'r, R> {
    /// Decide the parent phases from the original structure types.
    pub fn new(remap: &'r R, structures: &[StructureType]) -> Self {
        Self {
            remap,
            phases: ParentPhases::vote(structures),
            heap: BinaryHeap::new(),
            seq: 0,
            remap_failures: 0,
        }
    }

    /// Orient a bond as `(parent, defect)` if it crosses a coherent
    /// interface under the current types.
    fn interface_pair(&self, bond: &NeighborBond, structures: &[StructureType]) -> Option<(usize, usize)> {
        let (sa, sb) = (structures[bond.a], structures[bond.b]);
        if sa.interface_partner() != Some(sb) {
            return None;
        }
        if self.phases.is_parent(sa) { Some((bond.a, bond.b)) } else { Some((bond.b, bond.a)) }
    }

    /// Defect orientation remapped onto the parent, with its disorientation
    /// in degrees. Remap failures are counted and yield `None`.
    fn evaluate(
        &mut self,
        parent: usize,
        defect: usize,
        structures: &[StructureType],
        orientations: &[UnitQuaternion<f64>],
    ) -> Option<(f64, UnitQuaternion<f64>)> {
        match self.remap.remap_interface(structures[parent], &orientations[parent], &orientations[defect]) {
            Ok(r) => Some((r.disorientation.to_degrees(), r.orientation)),
            Err(e) => {
                self.remap_failures += 1;
                debug!(parent, defect, error = %e, "interface remap failed");
                None
            }
        }
    }

    fn push_if_eligible(
        &mut self,
        bond: &NeighborBond,
        structures: &[StructureType],
        orientations: &[UnitQuaternion<f64>],
    ) {
        let Some((parent, defect)) = self.interface_pair(bond, structures) else {
            return;
        };
        if let Some((disorientation, _)) = self.evaluate(parent, defect, structures, orientations) {
            if disorientation < MISORIENTATION_THRESHOLD {
                self.heap.push(Candidate { disorientation, seq: self.seq, parent, defect });
                self.seq += 1;
            }
        }
    }

    /// Convert defect-phase atoms in place. Returns the number of atoms
    /// whose type and orientation were changed.
    pub fn run(
        &mut self,
        bonds: &[NeighborBond],
        structures: &mut [StructureType],
        orientations: &mut [UnitQuaternion<f64>],
        cancel: &CancelFlag,
    ) -> Result<usize> {
        let n = structures.len();
        if orientations.len() != n {
            return Err(Error::InvalidInput("Structure and orientation arrays differ in length".into()));
        }

        let mut incident: Vec<SmallVec<[usize; 16]>> = vec![SmallVec::new(); n];
        for (i, bond) in bonds.iter().enumerate() {
            if bond.a >= n || bond.b >= n {
                return Err(Error::InvalidInput(format!("Bond ({}, {}) out of range", bond.a, bond.b)));
            }
            incident[bond.a].push(i);
            incident[bond.b].push(i);
        }

        for bond in bonds {
            self.push_if_eligible(bond, structures, orientations);
        }
        debug!(candidates = self.heap.len(), phases = ?self.phases, "seeded interface queue");

        let mut flipped = 0usize;
        let mut popped = 0usize;
        while let Some(candidate) = self.heap.pop() {
            popped += 1;
            if popped % 1024 == 0 {
                cancel.check()?;
            }

            let (parent, defect) = (candidate.parent, candidate.defect);
            let Some(target) = self.phases.target(structures[defect]) else {
                continue;
            };
            if structures[parent] != target {
                continue;
            }
            let Some((_, rotated)) = self.evaluate(parent, defect, structures, orientations) else {
                continue;
            };

            structures[defect] = target;
            orientations[defect] = rotated;
            flipped += 1;

            for &bi in &incident[defect] {
                self.push_if_eligible(&bonds[bi], structures, orientations);
            }
        }

        if self.remap_failures > 0 {
            warn!("Interface remapping failed for {} bonds", self.remap_failures);
        }
        info!("Converted {} defect-phase atoms to their parent phase", flipped);
        Ok(flipped)
    }
}
