//! Snapshot reconciliation.
//!
//! Each world snapshot is diffed against pools of drawables, one pool per
//! entity category and keyed by entity id:
//! - ids new to the pool get a drawable,
//! - ids already pooled get their transform and visibility refreshed,
//! - pooled ids missing from the snapshot are destroyed.
//!
//! Off-screen entities are hidden but stay pooled. Applying the same
//! snapshot twice creates and destroys nothing.

use std::collections::{BTreeMap, HashSet};

use race_shared::{
    math::{ScreenPos, TrackPos},
    palette,
    render::{Drawable, Outline, Shape},
    viewport::Viewport,
    world::WorldSnapshot,
};
use tracing::{debug, warn};

pub const PLAYER_WIDTH: f32 = 16.0;
pub const PLAYER_HEIGHT: f32 = 32.0;
pub const POWER_UP_RADIUS: f32 = 12.0;
pub const LOCAL_OUTLINE_WIDTH: f32 = 3.0;
pub const FINISHED_ALPHA: f32 = 0.3;
const LANE_LINE_WIDTH: f32 = 2.0;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
}

impl ReconcileReport {
    /// True when the pass only refreshed existing drawables.
    pub fn is_steady(&self) -> bool {
        self.created == 0 && self.destroyed == 0
    }

    fn absorb(&mut self, other: ReconcileReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.destroyed += other.destroyed;
    }
}

/// Drawables of one category keyed by entity id.
#[derive(Debug, Default)]
pub struct VisualPool {
    items: BTreeMap<String, Drawable>,
}

impl VisualPool {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Drawable> {
        self.items.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.items.values()
    }

    pub fn visible_count(&self) -> usize {
        self.items.values().filter(|d| d.visible).count()
    }

    /// Syncs the pool with `entities`, given as `(id, entity)` in snapshot
    /// order. `create` builds a drawable for a new id; `update` then runs for
    /// every present entity, new or not.
    pub fn sync<'a, T: 'a>(
        &mut self,
        entities: impl IntoIterator<Item = (&'a str, &'a T)>,
        mut create: impl FnMut(usize, &T) -> Drawable,
        mut update: impl FnMut(&T, &mut Drawable),
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for (index, (id, entity)) in entities.into_iter().enumerate() {
            seen.insert(id);
            match self.items.get_mut(id) {
                Some(drawable) => {
                    update(entity, drawable);
                    report.updated += 1;
                }
                None => {
                    let mut drawable = create(index, entity);
                    update(entity, &mut drawable);
                    self.items.insert(id.to_string(), drawable);
                    report.created += 1;
                }
            }
        }

        let before = self.items.len();
        self.items.retain(|id, _| seen.contains(id.as_str()));
        report.destroyed = before - self.items.len();
        report
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Race view state: camera reference plus the three entity pools.
#[derive(Debug)]
pub struct RaceView {
    viewport: Viewport,
    local_player: String,
    camera_z: f32,
    missing_player_warnings: u32,
    snapshots: u64,
    players: VisualPool,
    obstacles: VisualPool,
    power_ups: VisualPool,
}

impl RaceView {
    pub fn new(viewport: Viewport, local_player: &str) -> Self {
        Self {
            viewport,
            local_player: local_player.to_string(),
            camera_z: 0.0,
            missing_player_warnings: 0,
            snapshots: 0,
            players: VisualPool::default(),
            obstacles: VisualPool::default(),
            power_ups: VisualPool::default(),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn local_player(&self) -> &str {
        &self.local_player
    }

    pub fn camera_z(&self) -> f32 {
        self.camera_z
    }

    /// Warnings logged for a snapshot lacking the local player. At most one
    /// per view lifetime.
    pub fn missing_player_warnings(&self) -> u32 {
        self.missing_player_warnings
    }

    pub fn players(&self) -> &VisualPool {
        &self.players
    }

    pub fn obstacles(&self) -> &VisualPool {
        &self.obstacles
    }

    pub fn power_ups(&self) -> &VisualPool {
        &self.power_ups
    }

    fn update_camera(&mut self, snapshot: &WorldSnapshot) {
        match snapshot.find_player(&self.local_player) {
            Some(p) => self.camera_z = p.position.z,
            None => {
                if self.missing_player_warnings == 0 {
                    let available: Vec<&str> =
                        snapshot.players.iter().map(|p| p.player_id.as_str()).collect();
                    warn!(
                        player = %self.local_player,
                        ?available,
                        "Local player not found in snapshot; camera held"
                    );
                }
                self.missing_player_warnings = 1;
            }
        }
    }

    /// Reconciles all pools against `snapshot`.
    pub fn apply(&mut self, snapshot: &WorldSnapshot) -> ReconcileReport {
        self.snapshots += 1;
        self.update_camera(snapshot);

        let vp = &self.viewport;
        let camera_z = self.camera_z;
        let place = |pos: TrackPos, d: &mut Drawable| {
            d.pos = vp.project(pos, camera_z);
            d.visible = vp.is_on_screen(d.pos.y);
        };

        let mut report = ReconcileReport::default();

        let local = self.local_player.as_str();
        report.absorb(self.players.sync(
            snapshot.players.iter().map(|p| (p.player_id.as_str(), p)),
            |index, _| {
                Drawable::new(
                    Shape::Rect {
                        width: PLAYER_WIDTH,
                        height: PLAYER_HEIGHT,
                    },
                    palette::player_color(index),
                )
            },
            |p, d| {
                place(p.position, d);
                d.outline = (p.player_id == local).then_some(Outline {
                    width: LOCAL_OUTLINE_WIDTH,
                    color: palette::OUTLINE_LOCAL,
                });
                d.alpha = if p.is_finished { FINISHED_ALPHA } else { 1.0 };
            },
        ));

        report.absorb(self.obstacles.sync(
            snapshot.obstacles.iter().map(|o| (o.id.as_str(), o)),
            |_, o| {
                Drawable::new(
                    Shape::Rect {
                        width: o.size.x * vp.scale,
                        height: o.size.z * vp.scale,
                    },
                    palette::obstacle_color(o.kind),
                )
            },
            |o, d| place(o.position, d),
        ));

        report.absorb(self.power_ups.sync(
            snapshot.live_power_ups().map(|p| (p.id.as_str(), p)),
            |_, p| {
                Drawable::new(
                    Shape::Circle {
                        radius: POWER_UP_RADIUS,
                    },
                    palette::power_up_color(p.kind),
                )
            },
            |p, d| place(p.position, d),
        ));

        if self.snapshots % 60 == 0 {
            debug!(
                snapshots = self.snapshots,
                camera_z = self.camera_z,
                players = self.players.len(),
                obstacles = self.obstacles.len(),
                power_ups = self.power_ups.len(),
                "Race view"
            );
        }
        report
    }

    /// Track surface and lane dividers.
    pub fn backdrop(&self) -> Vec<Drawable> {
        let vp = &self.viewport;
        let centre_y = vp.canvas_height / 2.0;
        let mut track = Drawable::new(
            Shape::Rect {
                width: vp.track_width_px(),
                height: vp.canvas_height,
            },
            palette::TRACK,
        );
        track.pos = ScreenPos::new(vp.canvas_width / 2.0, centre_y);

        let mut out = vec![track];
        out.extend(vp.lane_divider_xs().into_iter().map(|x| {
            let mut line = Drawable::new(
                Shape::Rect {
                    width: LANE_LINE_WIDTH,
                    height: vp.canvas_height,
                },
                palette::LANE_LINE,
            );
            line.pos = ScreenPos::new(x, centre_y);
            line
        }));
        out
    }

    /// Entity drawables in paint order: obstacles, power-ups, players.
    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.obstacles
            .drawables()
            .chain(self.power_ups.drawables())
            .chain(self.players.drawables())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(json: &str) -> WorldSnapshot {
        serde_json::from_str(json).unwrap()
    }

    fn busy() -> WorldSnapshot {
        snapshot(
            r#"{"status":"RACING",
                "players":[
                    {"playerId":"P1","position":{"x":0,"z":120},"lane":1,"speed":40,"rank":1},
                    {"playerId":"P2","position":{"x":5,"z":110},"lane":2,"speed":38,"rank":2,"isFinished":true}],
                "obstacles":[
                    {"id":"o1","position":{"x":-5,"z":125},"size":{"x":2,"z":1},"type":"BARRIER"},
                    {"id":"o2","position":{"x":0,"z":400},"size":{"x":2,"z":1},"type":"SLOW_ZONE"}],
                "powerUps":[
                    {"id":"u1","position":{"x":5,"z":130},"type":"SHIELD","collected":false},
                    {"id":"u2","position":{"x":0,"z":131},"type":"BOOST","collected":true}]}"#,
        )
    }

    #[test]
    fn pools_match_live_entities() {
        let mut view = RaceView::new(Viewport::default(), "P1");
        let report = view.apply(&busy());
        assert_eq!(report.created, 5);

        let ids = |pool: &VisualPool| pool.ids().map(str::to_string).collect::<Vec<_>>();
        assert_eq!(ids(view.players()), ["P1", "P2"]);
        assert_eq!(ids(view.obstacles()), ["o1", "o2"]);
        // Collected power-ups are never pooled.
        assert_eq!(ids(view.power_ups()), ["u1"]);
    }

    #[test]
    fn applying_twice_is_steady() {
        let mut view = RaceView::new(Viewport::default(), "P1");
        view.apply(&busy());
        let second = view.apply(&busy());
        assert!(second.is_steady());
        assert_eq!(second.updated, 5);
    }

    #[test]
    fn vanished_entities_are_destroyed() {
        let mut view = RaceView::new(Viewport::default(), "P1");
        view.apply(&busy());
        let report = view.apply(&snapshot(
            r#"{"status":"RACING","players":[{"playerId":"P1","position":{"x":0,"z":121}}]}"#,
        ));
        assert_eq!(report.destroyed, 4);
        assert_eq!(report.created, 0);
        assert!(view.obstacles().is_empty());
    }

    #[test]
    fn local_player_sits_on_camera_row() {
        let mut view = RaceView::new(Viewport::default(), "P1");
        view.apply(&busy());
        assert_eq!(view.camera_z(), 120.0);

        let me = view.players().get("P1").unwrap();
        assert_eq!(me.pos, ScreenPos::new(400.0, 400.0));
        assert_eq!(me.outline.map(|o| o.width), Some(LOCAL_OUTLINE_WIDTH));
        assert_eq!(me.alpha, 1.0);
        assert_eq!(me.fill, palette::player_color(0));

        let other = view.players().get("P2").unwrap();
        assert!(other.outline.is_none());
        assert_eq!(other.alpha, FINISHED_ALPHA);
        // 10 units behind, 20 px per unit.
        assert_eq!(other.pos.y, 600.0);
        assert_eq!(other.pos.x, 500.0);
    }

    #[test]
    fn far_entities_are_hidden_not_destroyed() {
        let mut view = RaceView::new(Viewport::default(), "P1");
        view.apply(&busy());
        let far = view.obstacles().get("o2").unwrap();
        assert!(!far.visible);
        assert_eq!(far.fill, palette::OBSTACLE_SLOW);
        assert!(view.obstacles().get("o1").unwrap().visible);
        assert_eq!(view.obstacles().visible_count(), 1);
    }

    #[test]
    fn missing_local_player_holds_camera_and_warns_once() {
        let mut view = RaceView::new(Viewport::default(), "P1");
        view.apply(&busy());
        let before = view.camera_z();

        let others = snapshot(
            r#"{"status":"RACING","players":[
                {"playerId":"P2","position":{"x":0,"z":300}},
                {"playerId":"P3","position":{"x":5,"z":280}}]}"#,
        );
        view.apply(&others);
        view.apply(&others);
        assert_eq!(view.camera_z(), before);
        assert_eq!(view.missing_player_warnings(), 1);
        assert_eq!(view.players().len(), 2);
    }

    #[test]
    fn backdrop_has_track_and_dividers() {
        let view = RaceView::new(Viewport::default(), "P1");
        let backdrop = view.backdrop();
        assert_eq!(backdrop.len(), 3);
        assert_eq!(backdrop[0].fill, palette::TRACK);
        assert_eq!(backdrop[1].pos.x, 350.0);
        assert_eq!(backdrop[2].pos.x, 450.0);
    }
}
