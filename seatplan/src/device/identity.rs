//! Controller identities.

use crate::codec::{CellId, CELL_COUNT};
use crate::config::DEFAULT_SERIAL_NUMBERS;

use super::error::DeviceError;

/// One controller: the cell it drives and its USB serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub cell: CellId,
    pub serial: String,
}

/// Ordered serial numbers, one per cell.
///
/// Position N drives cell N+1 and receives chunk N+1 of every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityTable {
    entries: Vec<DeviceIdentity>,
}

impl IdentityTable {
    pub fn new<S: AsRef<str>>(serials: &[S]) -> Result<Self, DeviceError> {
        if serials.len() != CELL_COUNT {
            return Err(DeviceError::IdentityTable {
                expected: CELL_COUNT,
                actual: serials.len(),
            });
        }
        let entries = CellId::all()
            .zip(serials)
            .map(|(cell, serial)| DeviceIdentity {
                cell,
                serial: serial.as_ref().to_string(),
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.entries.iter()
    }

    pub fn get(&self, cell: CellId) -> &DeviceIdentity {
        &self.entries[cell.index()]
    }

    /// Cell driven by the controller with `serial`.
    pub fn cell_for(&self, serial: &str) -> Option<CellId> {
        self.entries
            .iter()
            .find(|entry| entry.serial == serial)
            .map(|entry| entry.cell)
    }
}

impl Default for IdentityTable {
    fn default() -> Self {
        Self {
            entries: CellId::all()
                .zip(DEFAULT_SERIAL_NUMBERS)
                .map(|(cell, serial)| DeviceIdentity {
                    cell,
                    serial: serial.to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_order() {
        let table = IdentityTable::default();
        let serials: Vec<_> = table.iter().map(|e| e.serial.as_str()).collect();
        assert_eq!(serials, DEFAULT_SERIAL_NUMBERS);
        assert_eq!(
            table.cell_for("3343736343635121F0B0"),
            CellId::new(2)
        );
        assert_eq!(table.cell_for("nope"), None);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            IdentityTable::new(&["a", "b", "c"]),
            Err(DeviceError::IdentityTable {
                expected: 4,
                actual: 3
            })
        ));
        let table = IdentityTable::new(&["a", "b", "c", "d"]).unwrap();
        assert_eq!(table.get(CellId::new(4).unwrap()).serial, "d");
    }
}
