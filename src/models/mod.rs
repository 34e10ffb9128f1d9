pub mod appointment;
pub mod pet;
pub mod photo;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt, str::FromStr};

/// Backend tables reachable from this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Pets,
    Appointments,
    PetPhotos,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Pets, Table::Appointments, Table::PetPhotos];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Pets => "pets",
            Table::Appointments => "appointments",
            Table::PetPhotos => "pet_photos",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|table| table.as_str() == value)
            .ok_or_else(|| format!("unknown table {value}, expected one of pets, appointments, pet_photos"))
    }
}

/// A record persisted in one backend table.
pub trait Entity: DeserializeOwned + Send + 'static {
    const TABLE: Table;
}

impl Entity for pet::Pet {
    const TABLE: Table = Table::Pets;
}

impl Entity for appointment::Appointment {
    const TABLE: Table = Table::Appointments;
}

impl Entity for photo::PetPhoto {
    const TABLE: Table = Table::PetPhotos;
}
