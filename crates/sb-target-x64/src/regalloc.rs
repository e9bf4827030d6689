//! Linear-scan register allocation.
//!
//! Maps virtual registers to a fixed pool of hardware-register numbers;
//! intervals that do not fit are spilled to stack slots. Integer and
//! float registers are allocated by two independent scans whose results
//! merge into one allocation.

use std::collections::BTreeMap;

use crate::liveness::LiveInterval;
use crate::lower::VirtualRegister;

/// Result of register allocation for one function.
///
/// Hardware registers are pool indices (`0..num_registers`); the ABI
/// layer maps them to physical registers per kind. Spilled registers
/// get stack-slot indices assigned in spill order.
#[derive(Debug, Clone, Default)]
pub struct RegisterAllocation {
    registers: BTreeMap<VirtualRegister, u8>,
    spill_slots: BTreeMap<VirtualRegister, u32>,
    next_spill_slot: u32,
}

impl RegisterAllocation {
    /// Create an empty allocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the hardware-register number assigned to a virtual register.
    pub fn hardware_register(&self, register: VirtualRegister) -> Option<u8> {
        self.registers.get(&register).copied()
    }

    /// Get the stack slot of a spilled register.
    pub fn spill_slot(&self, register: VirtualRegister) -> Option<u32> {
        self.spill_slots.get(&register).copied()
    }

    /// Check if a register was spilled.
    pub fn is_spilled(&self, register: VirtualRegister) -> bool {
        self.spill_slots.contains_key(&register)
    }

    /// Number of registers holding a hardware register.
    pub fn num_allocated(&self) -> usize {
        self.registers.len()
    }

    /// Number of spilled registers.
    pub fn num_spilled(&self) -> usize {
        self.spill_slots.len()
    }

    /// All register assignments.
    pub fn assignments(&self) -> &BTreeMap<VirtualRegister, u8> {
        &self.registers
    }

    fn assign(&mut self, register: VirtualRegister, hardware: u8) {
        self.registers.insert(register, hardware);
    }

    fn spill(&mut self, register: VirtualRegister) {
        self.registers.remove(&register);
        let slot = self.next_spill_slot;
        self.spill_slots.insert(register, slot);
        self.next_spill_slot += 1;
    }

    /// Merge two single-kind allocations. The second allocation's spill
    /// slots are offset past the first's so every spilled register has
    /// a distinct frame slot.
    pub fn merge(first: RegisterAllocation, second: RegisterAllocation) -> RegisterAllocation {
        let mut merged = first;
        let offset = merged.next_spill_slot;
        for (register, hardware) in second.registers {
            merged.registers.insert(register, hardware);
        }
        for (register, slot) in second.spill_slots {
            merged.spill_slots.insert(register, offset + slot);
        }
        merged.next_spill_slot += second.next_spill_slot;
        merged
    }
}

/// Allocate hardware registers for the given intervals with a linear
/// scan over `num_registers` registers.
///
/// All intervals are expected to share one register kind; run one scan
/// per kind and merge the results.
pub fn allocate_registers(
    intervals: &[LiveInterval],
    num_registers: usize,
) -> RegisterAllocation {
    let mut allocation = RegisterAllocation::new();

    let mut sorted: Vec<LiveInterval> = intervals.to_vec();
    sorted.sort_by_key(|interval| (interval.start, interval.end, interval.register));

    // Free pool, lowest number first.
    let mut free_registers: Vec<u8> = (0..num_registers as u8).rev().collect();
    // Active intervals, ordered by increasing end.
    let mut active: Vec<LiveInterval> = Vec::new();

    for interval in sorted {
        // Expire intervals that ended before this one starts.
        let mut index = 0;
        while index < active.len() {
            if active[index].end < interval.start {
                let expired = active.remove(index);
                let hardware = allocation
                    .hardware_register(expired.register)
                    .expect("active intervals hold a register");
                free_registers.push(hardware);
                free_registers.sort_by(|a, b| b.cmp(a));
            } else {
                index += 1;
            }
        }

        if active.len() == num_registers {
            // No register available: spill the interval with the
            // furthest end, keeping the other.
            match active.last().copied() {
                Some(furthest) if furthest.end > interval.end => {
                    let hardware = allocation
                        .hardware_register(furthest.register)
                        .expect("active intervals hold a register");
                    allocation.spill(furthest.register);
                    allocation.assign(interval.register, hardware);
                    active.pop();
                    let position = active
                        .partition_point(|a| (a.end, a.register) <= (interval.end, interval.register));
                    active.insert(position, interval);
                }
                _ => allocation.spill(interval.register),
            }
        } else {
            let hardware = free_registers.pop().expect("free pool is non-empty");
            allocation.assign(interval.register, hardware);
            let position = active
                .partition_point(|a| (a.end, a.register) <= (interval.end, interval.register));
            active.insert(position, interval);
        }
    }

    allocation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::RegisterKind;

    fn interval(number: u32, start: usize, end: usize) -> LiveInterval {
        LiveInterval {
            register: VirtualRegister::new(RegisterKind::Integer, number),
            start,
            end,
        }
    }

    #[test]
    fn test_no_pressure() {
        let intervals = [interval(0, 0, 3), interval(1, 1, 2)];
        let allocation = allocate_registers(&intervals, 7);
        assert_eq!(allocation.num_allocated(), 2);
        assert_eq!(allocation.num_spilled(), 0);
        assert_ne!(
            allocation.hardware_register(intervals[0].register),
            allocation.hardware_register(intervals[1].register)
        );
    }

    #[test]
    fn test_register_reuse_after_expiry() {
        let intervals = [interval(0, 0, 1), interval(1, 2, 3)];
        let allocation = allocate_registers(&intervals, 1);
        assert_eq!(allocation.num_allocated(), 2);
        assert_eq!(allocation.num_spilled(), 0);
    }

    #[test]
    fn test_spill_furthest_end() {
        // r0 lives longest; when r2 arrives it should steal r0's
        // register and r0 is spilled.
        let intervals = [interval(0, 0, 10), interval(1, 1, 3), interval(2, 2, 4)];
        let allocation = allocate_registers(&intervals, 2);
        assert_eq!(allocation.num_spilled(), 1);
        assert!(allocation.is_spilled(intervals[0].register));
        assert!(allocation
            .hardware_register(intervals[2].register)
            .is_some());
    }

    #[test]
    fn test_spill_new_interval() {
        // The newcomer ends last, so it is spilled directly.
        let intervals = [interval(0, 0, 4), interval(1, 1, 5), interval(2, 2, 10)];
        let allocation = allocate_registers(&intervals, 2);
        assert_eq!(allocation.num_spilled(), 1);
        assert!(allocation.is_spilled(intervals[2].register));
    }

    #[test]
    fn test_zero_registers_spills_everything() {
        let intervals = [interval(0, 0, 3), interval(1, 1, 2), interval(2, 2, 5)];
        let allocation = allocate_registers(&intervals, 0);
        assert_eq!(allocation.num_allocated(), 0);
        assert_eq!(allocation.num_spilled(), 3);
        // Slots follow spill order.
        assert_eq!(allocation.spill_slot(intervals[0].register), Some(0));
        assert_eq!(allocation.spill_slot(intervals[1].register), Some(1));
        assert_eq!(allocation.spill_slot(intervals[2].register), Some(2));
    }

    #[test]
    fn test_no_overlapping_assignment() {
        let intervals = [
            interval(0, 0, 5),
            interval(1, 1, 6),
            interval(2, 2, 7),
            interval(3, 3, 8),
            interval(4, 4, 9),
        ];
        let allocation = allocate_registers(&intervals, 3);
        assert!(allocation.num_allocated() <= 5);
        assert_eq!(allocation.num_allocated() + allocation.num_spilled(), 5);

        for a in &intervals {
            for b in &intervals {
                if a.register == b.register {
                    continue;
                }
                let (Some(ra), Some(rb)) = (
                    allocation.hardware_register(a.register),
                    allocation.hardware_register(b.register),
                ) else {
                    continue;
                };
                let overlap = a.start <= b.end && b.start <= a.end;
                if overlap {
                    assert_ne!(ra, rb, "overlapping intervals share a register");
                }
            }
        }
    }

    #[test]
    fn test_merge_offsets_spill_slots() {
        let mut first = RegisterAllocation::new();
        first.spill(VirtualRegister::new(RegisterKind::Integer, 0));
        first.spill(VirtualRegister::new(RegisterKind::Integer, 1));

        let mut second = RegisterAllocation::new();
        second.spill(VirtualRegister::new(RegisterKind::Float, 0));

        let merged = RegisterAllocation::merge(first, second);
        assert_eq!(merged.num_spilled(), 3);
        assert_eq!(
            merged.spill_slot(VirtualRegister::new(RegisterKind::Float, 0)),
            Some(2)
        );
    }
}
