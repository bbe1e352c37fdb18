//! Domain layer
//!
//! Persisted game entities and the avatars built on them

pub mod area;
pub mod avatar;
pub mod character;
pub mod monster;
pub mod npc;
pub mod user;

pub use area::{Area, AreaFrame, AreaHandler};
pub use avatar::{Avatar, AvatarData, AvatarNetwork, Dispatchable, Player};
pub use character::Character;
pub use monster::Monster;
pub use npc::Npc;
pub use user::User;

/// Tables for every model, created on open
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS characters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    level_id INTEGER NOT NULL DEFAULT 1,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    gender TEXT NOT NULL DEFAULT 'M',
    coins INTEGER NOT NULL DEFAULT 0,
    color_hair TEXT NOT NULL DEFAULT '000000',
    color_skin TEXT NOT NULL DEFAULT '000000',
    color_eye TEXT NOT NULL DEFAULT '000000',
    slot_bag INTEGER NOT NULL DEFAULT 30,
    slot_bank INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS areas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    asset TEXT NOT NULL DEFAULT '',
    music TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS areas_frames (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS areas_frames_links (
    area_id INTEGER NOT NULL,
    frame_id INTEGER NOT NULL,
    PRIMARY KEY (area_id, frame_id),
    FOREIGN KEY (area_id) REFERENCES areas(id),
    FOREIGN KEY (frame_id) REFERENCES areas_frames(id)
);

CREATE TABLE IF NOT EXISTS areas_handlers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    area_id INTEGER NOT NULL,
    handler TEXT NOT NULL,
    parameter TEXT,
    "order" INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (area_id) REFERENCES areas(id)
);

CREATE TABLE IF NOT EXISTS monsters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS npcs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_characters_user ON characters(user_id);
CREATE INDEX IF NOT EXISTS idx_areas_handlers_area ON areas_handlers(area_id);

PRAGMA foreign_keys = ON;
"#;
