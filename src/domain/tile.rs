/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Grass, // Solid
    Rock,  // Solid
}

impl Tile {
    /// Map legend: 'G' grass, 'R' rock, anything else is open air.
    /// The spawn marker 'P' is handled by the stage loader.
    pub fn from_char(ch: char) -> Tile {
        match ch {
            'G' => Tile::Grass,
            'R' => Tile::Rock,
            _ => Tile::Empty,
        }
    }

    /// Does this tile block movement from every side?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Grass | Tile::Rock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend() {
        assert_eq!(Tile::from_char('G'), Tile::Grass);
        assert_eq!(Tile::from_char('R'), Tile::Rock);
        assert_eq!(Tile::from_char('.'), Tile::Empty);
        assert_eq!(Tile::from_char('P'), Tile::Empty);
        assert!(Tile::Rock.is_solid());
        assert!(!Tile::Empty.is_solid());
    }
}
