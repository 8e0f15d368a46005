// Overlay derivation.
//
// Everything drawn on top of the tile grid (resonance threads between
// same-frequency tiles, the resonance-chamber caption, floating comment
// bubbles, the story panel and its threads, the metadata stamp, and map
// visibility) is a pure function of the interaction snapshot plus static
// content. `derive_overlays()` computes the whole set in one call; nothing
// here mutates canvas state, and callers re-derive whenever they need a
// fresh view.
//
// Visibility rules:
// - Resonance threads and the chamber caption need a known hovered tile,
//   overlays enabled, phase `Idle`, and no recalibration.
// - Comment bubbles and the story panel need overlays enabled and phase
//   `Idle`. With a frequency filter, bubbles show the top-quality comments of
//   that frequency; otherwise the hovered tile's frequency picks one.
// - The metadata stamp and map need a known hovered tile, phase `Idle`, and
//   no recalibration.
//
// Every bubble and story-thread endpoint is clamped into the configured safe
// band on both axes. Resonance endpoints are tile centers and are not
// clamped.
//
// See also: `canvas.rs` for `CanvasState::overlays()`, which seeds the
// generator from the canvas seed and the current hover/filter so repeated
// derivations of the same state agree.

use crate::canvas::InteractionState;
use crate::config::OverlayParams;
use crate::tile_field::TileField;
use crate::types::{Frequency, Point, Tile, TileId};
use channel972_content::{Comment, ContentLibrary};
use channel972_prng::RandomSource;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Canvas center, in percent; comment bubbles orbit it.
const CENTER: Point = Point::new(50.0, 50.0);

/// A thread from the hovered tile to another tile of the same frequency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResonanceConnection {
    pub from: TileId,
    pub to: TileId,
    pub frequency: Frequency,
    pub start: Point,
    pub end: Point,
    /// `"<FREQ> Node"`.
    pub title: String,
    /// `"Connected to <metadata>"`.
    pub preview: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentBubble {
    pub comment_id: String,
    pub text: String,
    pub author: String,
    pub ai_score: f32,
    pub frequency: Frequency,
    pub position: Point,
}

/// A thread from the hovered tile to a related story.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryConnection {
    pub story_id: String,
    pub title: String,
    pub preview: String,
    pub start: Point,
    pub end: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryPanel {
    pub story_id: String,
    pub title: String,
    pub location: String,
    pub author: String,
    pub frequency: Frequency,
    pub connections: SmallVec<[StoryConnection; 2]>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataStamp {
    pub tile_id: TileId,
    pub metadata: String,
    pub frequency: Frequency,
}

/// Everything visible on top of the grid for one interaction snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlaySet {
    pub resonance: SmallVec<[ResonanceConnection; 2]>,
    pub resonance_chamber: Option<String>,
    pub comments: SmallVec<[CommentBubble; 2]>,
    pub story: Option<StoryPanel>,
    pub metadata_stamp: Option<MetadataStamp>,
    pub map_visible: bool,
}

impl OverlaySet {
    pub fn is_empty(&self) -> bool {
        self.resonance.is_empty()
            && self.resonance_chamber.is_none()
            && self.comments.is_empty()
            && self.story.is_none()
            && self.metadata_stamp.is_none()
            && !self.map_visible
    }
}

/// Derive the overlay set for `state`.
///
/// Draws from `rng` in a fixed order (bubbles, then story pick, then story
/// thread ends), so a generator seeded from the same state reproduces the
/// same layout.
pub fn derive_overlays(
    state: &InteractionState,
    tiles: &TileField,
    content: &ContentLibrary,
    params: &OverlayParams,
    rng: &mut impl RandomSource,
) -> OverlaySet {
    let idle = state.transition_phase.is_idle();
    let unlocked = idle && !state.is_recalibrating;
    let hovered = state.hovered_tile_id.as_ref().and_then(|id| tiles.get(id));

    let mut set = OverlaySet::default();

    if let Some(tile) = hovered.filter(|_| unlocked && state.overlays_enabled) {
        set.resonance = resonance_connections(tile, tiles, params.max_resonance_connections);
        set.resonance_chamber = Some(format!(
            "Exploring {} frequency domain. Neural pathways activated. \
             Resonance detected across {} connected nodes.",
            tile.frequency,
            set.resonance.len()
        ));
    }

    if state.overlays_enabled && idle {
        set.comments = comment_bubbles(state, hovered, content, params, rng);
        if let Some(tile) = hovered {
            set.story = story_panel(tile, state.selected_frequency, content, params, rng);
        }
    }

    if let Some(tile) = hovered.filter(|_| unlocked) {
        set.metadata_stamp = Some(MetadataStamp {
            tile_id: tile.id.clone(),
            metadata: tile.metadata.clone(),
            frequency: tile.frequency,
        });
        set.map_visible = true;
    }

    set
}

// ---------------------------------------------------------------------------
// Pieces
// ---------------------------------------------------------------------------

fn resonance_connections(
    tile: &Tile,
    tiles: &TileField,
    limit: usize,
) -> SmallVec<[ResonanceConnection; 2]> {
    let start = tile.center();
    tiles
        .same_frequency(tile)
        .take(limit)
        .map(|other| ResonanceConnection {
            from: tile.id.clone(),
            to: other.id.clone(),
            frequency: other.frequency,
            start,
            end: other.center(),
            title: format!("{} Node", other.frequency),
            preview: format!("Connected to {}", other.metadata),
        })
        .collect()
}

fn comment_bubbles(
    state: &InteractionState,
    hovered: Option<&Tile>,
    content: &ContentLibrary,
    params: &OverlayParams,
    rng: &mut impl RandomSource,
) -> SmallVec<[CommentBubble; 2]> {
    let chosen: Vec<&Comment> = match (state.selected_frequency, hovered) {
        (Some(frequency), _) => content
            .comments_for(frequency)
            .filter(|c| c.ai_score > params.comment_quality_threshold)
            .take(params.max_filtered_comments)
            .collect(),
        (None, Some(tile)) => content
            .comments_for(tile.frequency)
            .take(params.max_hover_comments)
            .collect(),
        (None, None) => Vec::new(),
    };

    // Positions are drawn for every chosen comment before dismissals are
    // dropped, so dismissing one bubble never moves the others.
    chosen
        .into_iter()
        .enumerate()
        .map(|(index, comment)| (comment, bubble_position(index, params, rng)))
        .filter(|(comment, _)| !state.dismissed_comments.contains(&comment.id))
        .map(|(comment, position)| CommentBubble {
            comment_id: comment.id.clone(),
            text: comment.text.clone(),
            author: comment.author.clone(),
            ai_score: comment.ai_score,
            frequency: comment.frequency,
            position,
        })
        .collect()
}

fn bubble_position(index: usize, params: &OverlayParams, rng: &mut impl RandomSource) -> Point {
    let angle_deg =
        index as f64 * params.bubble_angle_step_deg + jitter(rng, params.bubble_angle_jitter_deg);
    let radius = params.bubble_radius + jitter(rng, params.bubble_radius_jitter);
    let angle = angle_deg.to_radians();
    Point::new(CENTER.x + angle.cos() * radius, CENTER.y + angle.sin() * radius)
        .clamped(params.safe_band)
}

fn story_panel(
    tile: &Tile,
    filter: Option<Frequency>,
    content: &ContentLibrary,
    params: &OverlayParams,
    rng: &mut impl RandomSource,
) -> Option<StoryPanel> {
    let frequency = filter.unwrap_or(tile.frequency);
    let related: Vec<_> = content.stories_for(frequency).collect();
    let story = related[rng.pick_index(related.len())?];

    let start = tile.center().clamped(params.safe_band);
    let (lo, hi) = params.thread_end_range;
    let connections = content
        .stories()
        .iter()
        .filter(|s| s.id != story.id && s.frequency == story.frequency)
        .take(params.max_story_connections)
        .map(|s| StoryConnection {
            story_id: s.id.clone(),
            title: s.title.clone(),
            preview: s.preview(params.story_preview_chars),
            start,
            end: Point::new(rng.range_f64(lo, hi), rng.range_f64(lo, hi))
                .clamped(params.safe_band),
        })
        .collect();

    Some(StoryPanel {
        story_id: story.id.clone(),
        title: story.title.clone(),
        location: story.location.clone(),
        author: story.author.clone(),
        frequency: story.frequency,
        connections,
    })
}

/// Uniform draw in `[0, max)`, or 0 when `max` is not positive.
fn jitter(rng: &mut impl RandomSource, max: f64) -> f64 {
    if max > 0.0 { rng.range_f64(0.0, max) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransitionPhase;
    use channel972_content::{Story, default_library};
    use channel972_prng::CanvasRng;

    fn tile(index: usize, frequency: Frequency, x: f64) -> Tile {
        Tile {
            id: TileId::for_index(index),
            x,
            y: 20.0,
            width: 10.0,
            height: 10.0,
            frequency,
            metadata: format!("NODE_{index:03}"),
        }
    }

    fn hovering(id: &str) -> InteractionState {
        InteractionState {
            hovered_tile_id: Some(TileId::from(id)),
            overlays_enabled: true,
            ..InteractionState::default()
        }
    }

    fn derive(state: &InteractionState, tiles: &TileField) -> OverlaySet {
        derive_overlays(
            state,
            tiles,
            &default_library(),
            &OverlayParams::default(),
            &mut CanvasRng::new(7),
        )
    }

    #[test]
    fn two_matching_tiles_give_one_connection() {
        let tiles = TileField::from_tiles(vec![
            tile(0, Frequency::Code, 10.0),
            tile(1, Frequency::Soul, 30.0),
            tile(2, Frequency::Code, 50.0),
        ]);
        let set = derive(&hovering("tile-0"), &tiles);
        assert_eq!(set.resonance.len(), 1);
        let c = &set.resonance[0];
        assert_eq!(c.to, TileId::from("tile-2"));
        assert_eq!(c.frequency, Frequency::Code);
        assert_eq!(c.start, Point::new(15.0, 25.0));
        assert_eq!(c.end, Point::new(55.0, 25.0));
        assert_eq!(c.title, "CODE Node");
        assert_eq!(c.preview, "Connected to NODE_002");
    }

    #[test]
    fn connections_capped_at_two_in_first_match_order() {
        let tiles = TileField::from_tiles(
            (0..5).map(|i| tile(i, Frequency::Chaos, 10.0 * i as f64)).collect(),
        );
        let set = derive(&hovering("tile-2"), &tiles);
        let targets: Vec<_> = set.resonance.iter().map(|c| c.to.as_str()).collect();
        assert_eq!(targets, vec!["tile-0", "tile-1"]);
        assert_eq!(
            set.resonance_chamber.as_deref(),
            Some(
                "Exploring CHAOS frequency domain. Neural pathways activated. \
                 Resonance detected across 2 connected nodes."
            )
        );
    }

    #[test]
    fn nothing_before_reveal_except_stamp_and_map() {
        let tiles = TileField::from_tiles(vec![tile(0, Frequency::Soul, 10.0)]);
        let state = InteractionState {
            overlays_enabled: false,
            ..hovering("tile-0")
        };
        let set = derive(&state, &tiles);
        assert!(set.resonance.is_empty());
        assert!(set.comments.is_empty());
        assert!(set.story.is_none());
        assert!(set.metadata_stamp.is_some());
        assert!(set.map_visible);
    }

    #[test]
    fn transition_hides_everything() {
        let tiles = TileField::from_tiles(vec![tile(0, Frequency::Soul, 10.0)]);
        let state = InteractionState {
            transition_phase: TransitionPhase::Immersive,
            selected_frequency: Some(Frequency::Soul),
            ..hovering("tile-0")
        };
        assert!(derive(&state, &tiles).is_empty());
    }

    #[test]
    fn recalibration_hides_threads_and_stamp_but_not_filtered_comments() {
        let tiles = TileField::from_tiles(vec![tile(0, Frequency::Soul, 10.0)]);
        let state = InteractionState {
            hovered_tile_id: None,
            is_recalibrating: true,
            selected_frequency: Some(Frequency::Soul),
            ..hovering("tile-0")
        };
        let set = derive(&state, &tiles);
        assert!(set.resonance.is_empty());
        assert!(set.metadata_stamp.is_none());
        assert!(!set.map_visible);
        assert_eq!(set.comments.len(), 2);
    }

    #[test]
    fn filtered_comments_need_quality_and_stay_in_band() {
        let tiles = TileField::default();
        let state = InteractionState {
            hovered_tile_id: None,
            selected_frequency: Some(Frequency::Soul),
            overlays_enabled: true,
            ..InteractionState::default()
        };
        for seed in 0..200 {
            let set = derive_overlays(
                &state,
                &tiles,
                &default_library(),
                &OverlayParams::default(),
                &mut CanvasRng::new(seed),
            );
            let ids: Vec<_> = set.comments.iter().map(|c| c.comment_id.as_str()).collect();
            assert_eq!(ids, vec!["c4", "c5"]);
            for bubble in &set.comments {
                assert!(bubble.ai_score > 0.85);
                assert!((15.0..=85.0).contains(&bubble.position.x));
                assert!((15.0..=85.0).contains(&bubble.position.y));
            }
        }
    }

    #[test]
    fn hover_without_filter_shows_one_comment() {
        let tiles = TileField::from_tiles(vec![tile(0, Frequency::Chaos, 10.0)]);
        let set = derive(&hovering("tile-0"), &tiles);
        assert_eq!(set.comments.len(), 1);
        assert_eq!(set.comments[0].frequency, Frequency::Chaos);
    }

    #[test]
    fn dismissed_comment_is_dropped_and_others_keep_position() {
        let tiles = TileField::default();
        let mut state = InteractionState {
            selected_frequency: Some(Frequency::Soul),
            overlays_enabled: true,
            ..InteractionState::default()
        };
        let before = derive(&state, &tiles);
        state.dismissed_comments.insert("c4".into());
        let after = derive(&state, &tiles);
        assert_eq!(after.comments.len(), 1);
        assert_eq!(after.comments[0].comment_id, "c5");
        assert_eq!(after.comments[0].position, before.comments[1].position);
    }

    #[test]
    fn story_follows_filter_over_tile_frequency() {
        let tiles = TileField::from_tiles(vec![tile(0, Frequency::Chaos, 10.0)]);
        let state = InteractionState {
            selected_frequency: Some(Frequency::Code),
            ..hovering("tile-0")
        };
        let story = derive(&state, &tiles).story.unwrap();
        assert_eq!(story.frequency, Frequency::Code);
    }

    #[test]
    fn story_connections_are_same_frequency_and_clamped() {
        let mut library = default_library();
        let extra = |id: &str| Story {
            id: id.into(),
            title: format!("Title {id}"),
            content: "x".repeat(150),
            location: "Haifa".into(),
            frequency: Frequency::Soul,
            timestamp: "2024-03-14T09:15:00Z".into(),
            author: "a".into(),
            tags: vec![],
            resonance_score: 0.5,
        };
        let mut stories = library.stories().to_vec();
        stories.extend(["s-a", "s-b", "s-c"].map(extra));
        library = ContentLibrary::new(stories, library.comments().to_vec(), vec![]);

        let tiles = TileField::from_tiles(vec![tile(0, Frequency::Soul, 0.0)]);
        for seed in 0..50 {
            let set = derive_overlays(
                &hovering("tile-0"),
                &tiles,
                &library,
                &OverlayParams::default(),
                &mut CanvasRng::new(seed),
            );
            let panel = set.story.unwrap();
            assert_eq!(panel.connections.len(), 2);
            for c in &panel.connections {
                assert_ne!(c.story_id, panel.story_id);
                assert_eq!(c.start, Point::new(15.0, 25.0));
                assert!((15.0..=85.0).contains(&c.end.x));
                assert!((15.0..=85.0).contains(&c.end.y));
            }
        }
    }

    #[test]
    fn unknown_hover_yields_no_tile_overlays() {
        let tiles = TileField::from_tiles(vec![tile(0, Frequency::Soul, 10.0)]);
        let set = derive(&hovering("tile-99"), &tiles);
        assert!(set.is_empty());
    }

    #[test]
    fn same_seed_same_layout() {
        let tiles = TileField::from_tiles(vec![tile(0, Frequency::Soul, 10.0)]);
        assert_eq!(derive(&hovering("tile-0"), &tiles), derive(&hovering("tile-0"), &tiles));
    }
}
