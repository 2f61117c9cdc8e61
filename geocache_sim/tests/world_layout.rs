use std::sync::Arc;

use geocache_sim::{
    regenerate_visible, CellCoord, GameConfig, GameSession, GridStore, LatLng, MemoryStore,
};

fn listing(caches: impl IntoIterator<Item = (CellCoord, u32)>) -> String {
    caches
        .into_iter()
        .map(|(cell, value)| format!("{cell}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn caches_around_the_origin_are_fixed() {
    let spawner = GameConfig::default().spawner();
    let caches = regenerate_visible(CellCoord::new(0, 0), 4, &GridStore::new(), &spawner);
    insta::assert_snapshot!(listing(caches), @"-4,-2=1 0,0=4 0,1=2 2,0=2 3,0=8 3,3=4");
}

#[test]
fn caches_far_from_the_origin_are_fixed() {
    let spawner = GameConfig::default().spawner();
    let caches = regenerate_visible(CellCoord::new(100, -250), 3, &GridStore::new(), &spawner);
    assert_eq!(
        listing(caches),
        "98,-253=2 99,-252=2 100,-251=4 101,-253=2 101,-251=8"
    );
}

#[test]
fn builtin_session_starts_on_the_classroom_cell() {
    let session = GameSession::new(GameConfig::builtin(), Box::new(MemoryStore::new()));
    let config = session.config();
    assert_eq!(session.player().position(), config.origin);
    assert_eq!(session.player_cell(), CellCoord::new(0, 0));
    assert_eq!(session.visible_caches().radius(), 25);
    assert_eq!(session.visible_caches().get(CellCoord::new(0, 0)), Some(4));
    assert_eq!(session.visible_caches().get(CellCoord::new(3, 3)), Some(4));
    assert_eq!(session.visible_caches().get(CellCoord::new(0, 2)), None);
}

#[test]
fn panning_away_and_back_regenerates_identically() {
    let config = Arc::new(GameConfig::default());
    let mut session = GameSession::new(config.clone(), Box::new(MemoryStore::new()));
    let before = session.visible_caches().cells().clone();

    let far = config.origin + LatLng::new(0.05, -0.05);
    session.notify_viewport(far, None);
    assert_ne!(session.visible_caches().cells(), &before);
    session.notify_viewport(config.origin, None);
    assert_eq!(session.visible_caches().cells(), &before);
}
