//! Rooms, exits and participant positions.
//!
//! A [`World`] is a directional graph: each [`Room`] maps lowercase
//! direction names to an [`Exit`], and each exit points at another room by
//! id. Two-way passages are two exits created together by
//! [`World::connect`]. Locked exits exist in the graph but cannot be
//! walked through and are not listed by [`World::look`].
//!
//! The world also tracks which room every participant is standing in.
//! Participants appear in the start room when added.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use dicerealms_protocol::ParticipantId;
use serde::{Deserialize, Serialize};

use crate::WorldError;

const STARTER_TITLE: &str = "DiceRealms - Beginner's Vale";
const STARTER_ROOM: &str = "town_square";

/// Returns the reverse of a compass or vertical direction.
pub fn opposite_direction(direction: &str) -> Option<&'static str> {
    match direction.to_ascii_lowercase().as_str() {
        "north" => Some("south"),
        "south" => Some("north"),
        "east" => Some("west"),
        "west" => Some("east"),
        "up" => Some("down"),
        "down" => Some("up"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Room / Exit
// ---------------------------------------------------------------------------

/// A directed edge to another room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    /// Id of the destination room.
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub locked: bool,
}

impl Exit {
    /// An unlocked exit with no description.
    pub fn to(room_id: impl Into<String>) -> Self {
        Self {
            to: room_id.into(),
            description: None,
            locked: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A node in the world graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exits: BTreeMap<String, Exit>,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            exits: BTreeMap::new(),
        }
    }

    /// Adds or replaces the exit in `direction` (stored lowercase).
    pub fn add_exit(&mut self, direction: &str, exit: Exit) {
        self.exits.insert(direction.to_ascii_lowercase(), exit);
    }

    /// Unlocked exits as `direction -> room id`, sorted by direction.
    pub fn open_exits(&self) -> BTreeMap<String, String> {
        self.exits
            .iter()
            .filter(|(_, exit)| !exit.locked)
            .map(|(dir, exit)| (dir.clone(), exit.to.clone()))
            .collect()
    }
}

/// A completed move, as reported by [`World::move_participant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// The direction taken, lowercased.
    pub direction: String,
    pub from_id: String,
    pub from_name: String,
    pub to_id: String,
    pub to_name: String,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// On-disk shape of a world document.
#[derive(Debug, Serialize, Deserialize)]
struct WorldDocument {
    #[serde(default = "default_title")]
    title: String,
    /// Room new participants appear in. Defaults to the first room listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(default)]
    rooms: Vec<Room>,
}

fn default_title() -> String {
    "DiceRealms".to_string()
}

/// The room graph plus participant positions.
#[derive(Debug, Clone)]
pub struct World {
    title: String,
    start_room: String,
    rooms: BTreeMap<String, Room>,
    positions: HashMap<ParticipantId, String>,
}

impl World {
    /// Creates an empty world. Add `start_room` before placing anyone.
    pub fn new(title: impl Into<String>, start_room: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start_room: start_room.into(),
            rooms: BTreeMap::new(),
            positions: HashMap::new(),
        }
    }

    /// The five-room starter map.
    ///
    /// ```text
    ///   Old City Gate
    ///        ^ north (one-way, locked)
    ///   North Road
    ///        | north/south
    ///   Town Square
    ///        | south/north
    ///     Tavern --east/west-- Market
    /// ```
    pub fn starter() -> Self {
        let built = Self::build_starter();
        debug_assert!(built.is_ok(), "starter map: {:?}", built.as_ref().err());
        built.unwrap_or_else(|e| {
            tracing::error!(error = %e, "starter map is inconsistent");
            Self::new(STARTER_TITLE, STARTER_ROOM)
        })
    }

    fn build_starter() -> Result<Self, WorldError> {
        let mut w = Self::new(STARTER_TITLE, STARTER_ROOM);
        let rooms = [
            (
                "town_square",
                "Town Square",
                "The bustling heart of the village. A fountain burbles cheerfully.",
            ),
            (
                "tavern",
                "Tavern",
                "Warm firelight and the smell of stew. Adventurers trade stories here.",
            ),
            (
                "market",
                "Market",
                "Stalls clutter the lane with trinkets, tools, and a suspiciously shiny apple.",
            ),
            (
                "north_road",
                "North Road",
                "A dirt road lined with wind-bent trees leads toward old stone walls.",
            ),
            (
                "gate",
                "Old City Gate",
                "Massive wooden doors bound with iron. They appear firmly shut.",
            ),
        ];
        for (id, name, description) in rooms {
            w.rooms.insert(id.into(), Room::new(id, name, description));
        }
        for (a, dir, b) in [
            ("town_square", "south", "tavern"),
            ("tavern", "east", "market"),
            ("town_square", "north", "north_road"),
        ] {
            w.connect(a, dir, b)?;
        }
        w.connect_one_way(
            "north_road",
            "north",
            Exit::to("gate").locked().described("The gate is shut tight."),
        )?;
        Ok(w)
    }

    /// Loads a world from its JSON document form.
    ///
    /// Exits must point at rooms defined in the same document.
    ///
    /// # Errors
    /// `Document` for malformed JSON, `DuplicateRoom` for repeated ids,
    /// `RoomNotFound` for a dangling exit or start room.
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let doc: WorldDocument = serde_json::from_str(json)?;
        let start = match doc.start {
            Some(start) => start,
            None => doc
                .rooms
                .first()
                .map(|r| r.id.clone())
                .ok_or_else(|| WorldError::RoomNotFound("<start>".into()))?,
        };

        let mut world = Self::new(doc.title, start);
        for room in doc.rooms {
            let mut normalized = Room::new(room.id, room.name, room.description);
            for (dir, exit) in room.exits {
                normalized.add_exit(&dir, exit);
            }
            world.add_room(normalized)?;
        }

        if !world.has_room(&world.start_room) {
            return Err(WorldError::RoomNotFound(world.start_room));
        }
        for room in world.rooms.values() {
            if let Some(exit) =
                room.exits.values().find(|e| !world.rooms.contains_key(&e.to))
            {
                return Err(WorldError::RoomNotFound(exit.to.clone()));
            }
        }

        tracing::debug!(
            title = %world.title,
            rooms = world.rooms.len(),
            "world loaded"
        );
        Ok(world)
    }

    /// Serializes the room graph. Positions are not included.
    pub fn to_json(&self) -> Result<String, WorldError> {
        let doc = WorldDocument {
            title: self.title.clone(),
            start: Some(self.start_room.clone()),
            rooms: self.rooms.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start_room(&self) -> &str {
        &self.start_room
    }

    // -- Graph mutation ----------------------------------------------------

    pub fn add_room(&mut self, room: Room) -> Result<(), WorldError> {
        if self.rooms.contains_key(&room.id) {
            return Err(WorldError::DuplicateRoom(room.id));
        }
        self.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    /// Shorthand for `add_room(Room::new(..))`.
    pub fn add(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<&mut Room, WorldError> {
        self.add_room(Room::new(id, name, description))?;
        self.rooms
            .get_mut(id)
            .ok_or_else(|| WorldError::RoomNotFound(id.to_string()))
    }

    /// Joins two rooms both ways: `a --direction--> b` and the opposite
    /// direction back.
    pub fn connect(
        &mut self,
        a: &str,
        direction: &str,
        b: &str,
    ) -> Result<(), WorldError> {
        let back = opposite_direction(direction)
            .ok_or_else(|| WorldError::NoOppositeDirection(direction.into()))?;
        self.require(b)?;
        self.connect_one_way(a, direction, Exit::to(b))?;
        self.connect_one_way(b, back, Exit::to(a))
    }

    /// Adds a single exit from `from`.
    pub fn connect_one_way(
        &mut self,
        from: &str,
        direction: &str,
        exit: Exit,
    ) -> Result<(), WorldError> {
        self.require(&exit.to)?;
        self.rooms
            .get_mut(from)
            .ok_or_else(|| WorldError::RoomNotFound(from.to_string()))?
            .add_exit(direction, exit);
        Ok(())
    }

    // -- Graph queries -----------------------------------------------------

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn has_room(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    fn require(&self, id: &str) -> Result<&Room, WorldError> {
        self.rooms
            .get(id)
            .ok_or_else(|| WorldError::RoomNotFound(id.to_string()))
    }

    /// Describes a room: name, blank line, description, blank line, then
    /// the sorted open exits or "No obvious exits.".
    pub fn look(&self, room_id: &str) -> Result<String, WorldError> {
        let room = self.require(room_id)?;
        let exits = room.open_exits();
        let exit_line = if exits.is_empty() {
            "No obvious exits.".to_string()
        } else {
            let dirs: Vec<&str> = exits.keys().map(String::as_str).collect();
            format!("Exits: {}", dirs.join(", "))
        };
        Ok(format!(
            "{}\n\n{}\n\n{}",
            room.name,
            room.description.trim(),
            exit_line
        )
        .trim()
        .to_string())
    }

    /// Open exits of a room as `direction -> room id`.
    pub fn neighbors(
        &self,
        room_id: &str,
    ) -> Result<BTreeMap<String, String>, WorldError> {
        Ok(self.require(room_id)?.open_exits())
    }

    /// Shortest walk from `start` to `goal` through open exits, both ends
    /// included. `None` if either room is missing or `goal` is unreachable.
    pub fn find_path(&self, start: &str, goal: &str) -> Option<Vec<String>> {
        if !self.has_room(start) || !self.has_room(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start.to_string()]);
        }

        let mut came_from: HashMap<String, String> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::from([start.to_string()]);
        let mut queue = VecDeque::from([start.to_string()]);

        while let Some(current) = queue.pop_front() {
            for next in self.rooms.get(&current)?.open_exits().into_values() {
                if !seen.insert(next.clone()) {
                    continue;
                }
                came_from.insert(next.clone(), current.clone());
                if next == goal {
                    let mut path = vec![next];
                    let mut cursor = current.clone();
                    loop {
                        path.push(cursor.clone());
                        match came_from.get(&cursor) {
                            Some(prev) => cursor = prev.clone(),
                            None => break,
                        }
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    // -- Participants ------------------------------------------------------

    /// Places a participant in the start room. Re-adding keeps the current
    /// position.
    pub fn add_participant(
        &mut self,
        id: ParticipantId,
    ) -> Result<&Room, WorldError> {
        if !self.positions.contains_key(&id) {
            self.require(&self.start_room)?;
            self.positions.insert(id, self.start_room.clone());
        }
        self.position(id).ok_or(WorldError::UnknownParticipant(id))
    }

    /// Removes a participant. Returns the id of the room they were in.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<String> {
        self.positions.remove(&id)
    }

    pub fn contains_participant(&self, id: ParticipantId) -> bool {
        self.positions.contains_key(&id)
    }

    /// The room a participant stands in.
    pub fn position(&self, id: ParticipantId) -> Option<&Room> {
        self.positions.get(&id).and_then(|room| self.rooms.get(room))
    }

    /// Everyone in `room_id`, lowest id first.
    pub fn participants_in(&self, room_id: &str) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self
            .positions
            .iter()
            .filter(|(_, room)| room.as_str() == room_id)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Walks a participant through the exit in `direction`
    /// (case-insensitive).
    ///
    /// # Errors
    /// `UnknownParticipant` if not placed, `NoExit` if the room has no exit
    /// that way, `ExitLocked` if it is locked.
    pub fn move_participant(
        &mut self,
        id: ParticipantId,
        direction: &str,
    ) -> Result<Move, WorldError> {
        let direction = direction.trim().to_ascii_lowercase();
        let from = self.position(id).ok_or(WorldError::UnknownParticipant(id))?;

        let exit = from.exits.get(&direction).ok_or_else(|| WorldError::NoExit {
            room: from.name.clone(),
            direction: direction.clone(),
        })?;
        if exit.locked {
            return Err(WorldError::ExitLocked { direction });
        }
        let to = self.require(&exit.to)?;

        let mv = Move {
            direction,
            from_id: from.id.clone(),
            from_name: from.name.clone(),
            to_id: to.id.clone(),
            to_name: to.name.clone(),
        };
        self.positions.insert(id, mv.to_id.clone());
        Ok(mv)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::starter()
    }
}

// =========================================================================
// Tests
// =========================================================================
