//! Module implement reference count fixup, applied after replaying a
//! transaction log or reloading an attribute.

use log::info;

use std::{collections::BTreeMap, convert::TryFrom};

use crate::{
    store::{table::State, EnumIndex, EnumStore, RefCountDelta},
    Error, Result,
};

impl<V, C> EnumStore<V, C> {
    /// Replay reference count deltas, in order. Either all deltas are
    /// applied or none, a delta referring to unknown entry or bringing a
    /// count below ZERO fails the replay.
    ///
    /// Replaying the same deltas twice shall apply them twice.
    pub fn fixup_ref_counts(&mut self, deltas: &[RefCountDelta]) -> Result<()> {
        let mut scratch: BTreeMap<EnumIndex, i64> = BTreeMap::new();

        for RefCountDelta { index, delta } in deltas.iter() {
            let count = match scratch.get(index) {
                Some(count) => *count,
                None => {
                    let slot = self.table.to_slot(*index)?;
                    if slot.state != State::Live {
                        err_at!(InvalidInput, msg: "fixup {} in {:?}", index, slot.state)?;
                    }
                    i64::from(slot.ref_count)
                }
            };
            let count = match count.checked_add(*delta) {
                Some(count) if count >= 0 => count,
                _ => err_at!(InvalidInput, msg: "fixup {} {}{:+}", index, count, delta)?,
            };
            scratch.insert(*index, count);
        }

        let mut items = vec![];
        for (index, count) in scratch.into_iter() {
            let count = err_at!(FailConvert, u32::try_from(count), "fixup {}", index)?;
            items.push((index, count));
        }

        // all deltas are valid, apply.
        for (index, count) in items.into_iter() {
            self.table.set_ref_count(index, count)?;
            if count == 0 {
                self.unused.push(index);
            }
        }

        info!(target: "enumstore", "{:?}, fixup {} deltas", self.config.name, deltas.len());
        Ok(())
    }
}

impl<V, C> EnumStore<V, C>
where
    V: Clone,
{
    /// Set reference counts from `hist`, the i-th count applies to the i-th
    /// value in dictionary order.
    pub fn fixup_ref_counts_from_histogram(&mut self, hist: &[u32]) -> Result<()> {
        if hist.len() != self.dict.len() {
            let (n, m) = (hist.len(), self.dict.len());
            err_at!(InvalidInput, msg: "histogram len {} != uniques {}", n, m)?;
        }

        for ((_, index), count) in self.dict.iter().zip(hist.iter()) {
            self.table.set_ref_count(index, *count)?;
            if *count == 0 {
                self.unused.push(index);
            }
        }

        let name = &self.config.name;
        info!(target: "enumstore", "{:?}, fixup from histogram of {}", name, hist.len());
        Ok(())
    }
}

#[cfg(test)]
#[path = "fixup_test.rs"]
mod fixup_test;
