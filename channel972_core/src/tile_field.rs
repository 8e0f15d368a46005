// Tile generation and ownership.
//
// `TileField` generates the canvas tiles once, at mount, and is the only owner
// of tile geometry afterwards. Everyone else refers to tiles by `TileId` and
// reads through `get()`.
//
// Generation draws, per tile and in this order: frequency (uniform over the
// four values), x, y, width, height (uniform within the configured half-open
// ranges). Overlap is allowed; the breathing grid is meant to look layered.
//
// **Critical constraint: determinism.** All draws come from the injected
// `RandomSource`, so the same seed yields the same layout.

use crate::config::TileLayoutParams;
use crate::types::{Frequency, Tile, TileId};
use channel972_prng::RandomSource;

/// The immutable tile set of one canvas session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileField {
    tiles: Vec<Tile>,
}

impl TileField {
    /// Generate `params.tile_count` tiles tagged from `frequencies`.
    ///
    /// `frequencies` is normally `Frequency::ALL`; an empty slice falls back
    /// to it.
    pub fn generate(
        params: &TileLayoutParams,
        frequencies: &[Frequency],
        rng: &mut impl RandomSource,
    ) -> Self {
        let frequencies: &[Frequency] = if frequencies.is_empty() {
            &Frequency::ALL
        } else {
            frequencies
        };
        let (pos_lo, pos_hi) = params.position_range;
        let (size_lo, size_hi) = params.size_range;

        let tiles = (0..params.tile_count)
            .map(|i| {
                let frequency = frequencies[rng.range_u64(0, frequencies.len() as u64) as usize];
                let x = rng.range_f64(pos_lo, pos_hi);
                let y = rng.range_f64(pos_lo, pos_hi);
                let width = rng.range_f64(size_lo, size_hi);
                let height = rng.range_f64(size_lo, size_hi);
                Tile {
                    id: TileId::for_index(i),
                    x,
                    y,
                    width,
                    height,
                    frequency,
                    metadata: format!("NODE_{i:03}"),
                }
            })
            .collect();

        Self { tiles }
    }

    /// Wrap an explicit tile list, e.g. a hand-built fixture.
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Look up a tile; unknown ids are simply `None`.
    pub fn get(&self, id: &TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| &t.id == id)
    }

    /// Other tiles sharing `tile`'s frequency, in generation order.
    pub fn same_frequency<'a>(&'a self, tile: &'a Tile) -> impl Iterator<Item = &'a Tile> + 'a {
        self.tiles
            .iter()
            .filter(move |t| t.id != tile.id && t.frequency == tile.frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use channel972_prng::CanvasRng;

    fn field(seed: u64) -> TileField {
        TileField::generate(
            &TileLayoutParams::default(),
            &Frequency::ALL,
            &mut CanvasRng::new(seed),
        )
    }

    #[test]
    fn generates_thirty_tiles_in_bounds() {
        let f = field(42);
        assert_eq!(f.len(), 30);
        for t in f.tiles() {
            assert!((10.0..90.0).contains(&t.x), "x out of range: {}", t.x);
            assert!((10.0..90.0).contains(&t.y), "y out of range: {}", t.y);
            assert!((8.0..23.0).contains(&t.width));
            assert!((8.0..23.0).contains(&t.height));
        }
    }

    #[test]
    fn ids_and_metadata_follow_index() {
        let f = field(1);
        assert_eq!(f.tiles()[0].id, TileId::from("tile-0"));
        assert_eq!(f.tiles()[0].metadata, "NODE_000");
        assert_eq!(f.tiles()[29].id, TileId::from("tile-29"));
        assert_eq!(f.tiles()[29].metadata, "NODE_029");
    }

    #[test]
    fn same_seed_same_layout() {
        assert_eq!(field(972), field(972));
        assert_ne!(field(972), field(973));
    }

    #[test]
    fn restricted_frequency_set_is_honored() {
        let f = TileField::generate(
            &TileLayoutParams::default(),
            &[Frequency::Soul],
            &mut CanvasRng::new(5),
        );
        assert!(f.tiles().iter().all(|t| t.frequency == Frequency::Soul));
    }

    #[test]
    fn all_frequencies_appear_in_a_large_field() {
        let params = TileLayoutParams {
            tile_count: 400,
            ..TileLayoutParams::default()
        };
        let f = TileField::generate(&params, &Frequency::ALL, &mut CanvasRng::new(8));
        for freq in Frequency::ALL {
            assert!(f.tiles().iter().any(|t| t.frequency == freq));
        }
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(field(3).get(&TileId::from("tile-999")).is_none());
    }

    #[test]
    fn same_frequency_excludes_self() {
        let f = field(11);
        let first = &f.tiles()[0];
        assert!(f.same_frequency(first).all(|t| t.id != first.id && t.frequency == first.frequency));
    }
}
