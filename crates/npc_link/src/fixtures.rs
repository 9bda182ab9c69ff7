//! Static scenario tables handed to the backend as world context.
//!
//! Nothing here is interpreted on the client. Names are matched by plain string
//! equality, and the only behavior is lookup and a plain-text summary.

use std::fmt::{self, Write as _};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    PharaohsTomb,
    CelestialSpire,
    GrocersParadise,
    SupermarketWorld,
}

impl ScenarioId {
    pub const ALL: [ScenarioId; 4] = [
        ScenarioId::PharaohsTomb,
        ScenarioId::CelestialSpire,
        ScenarioId::GrocersParadise,
        ScenarioId::SupermarketWorld,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            ScenarioId::PharaohsTomb => "tomb",
            ScenarioId::CelestialSpire => "space_station",
            ScenarioId::GrocersParadise => "supermarket",
            ScenarioId::SupermarketWorld => "supermarket_world",
        }
    }

    pub fn from_key(key: &str) -> Option<ScenarioId> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.key().eq_ignore_ascii_case(key))
    }

    /// Raw C# rendition shipped under `assets/fixtures/`.
    pub const fn file_name(self) -> &'static str {
        match self {
            ScenarioId::PharaohsTomb => "egyptian_tomb.cs",
            ScenarioId::CelestialSpire => "space_station_bay.cs",
            ScenarioId::GrocersParadise => "supermarket_environment.cs",
            ScenarioId::SupermarketWorld => "supermarket_world.cs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureObject {
    pub name: &'static str,
    pub kind: &'static str,
    pub location: &'static str,
    pub broken: bool,
    pub missing: bool,
    pub state: Option<&'static str>,
}

impl fmt::Display for FixtureObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} in {}", self.kind, self.name, self.location)?;
        if let Some(state) = self.state {
            write!(f, " (State: {state})")?;
        }
        if self.broken {
            f.write_str(" [broken]")?;
        }
        if self.missing {
            f.write_str(" [missing]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureCharacter {
    pub name: &'static str,
    pub role: &'static str,
    pub location: &'static str,
    pub present: bool,
    pub status: Option<&'static str>,
}

impl fmt::Display for FixtureCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) in {}", self.name, self.role, self.location)?;
        if let Some(status) = self.status {
            write!(f, " (Status: {status})")?;
        }
        if !self.present {
            f.write_str(" [away]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioFixture {
    pub id: ScenarioId,
    pub title: &'static str,
    pub game_state: &'static [(&'static str, &'static str)],
    pub location_contents: &'static [(&'static str, &'static str)],
    pub known_locations: &'static [(&'static str, &'static str)],
    pub coordinates: &'static [(&'static str, [f32; 3])],
    pub objects: &'static [FixtureObject],
    pub characters: &'static [FixtureCharacter],
}

impl ScenarioFixture {
    pub fn object(&self, name: &str) -> Option<&FixtureObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn character(&self, name: &str) -> Option<&FixtureCharacter> {
        self.characters
            .iter()
            .find(|character| character.name == name)
    }

    pub fn location_position(&self, name: &str) -> Option<[f32; 3]> {
        self.coordinates
            .iter()
            .find(|(location, _)| *location == name)
            .map(|(_, position)| *position)
    }

    pub fn environment_description(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        out.push('\n');
        section(&mut out, "Current Game State:", self.game_state.iter(), |out, (key, value)| {
            let _ = writeln!(out, "  {key}: {value}");
        });
        section(&mut out, "Objects:", self.objects.iter(), |out, object| {
            let _ = writeln!(out, "  - {object}");
        });
        section(&mut out, "Characters:", self.characters.iter(), |out, character| {
            let _ = writeln!(out, "  - {character}");
        });
        section(
            &mut out,
            "Location Contents:",
            self.location_contents.iter(),
            |out, (location, contents)| {
                let _ = writeln!(out, "  - {location}: {contents}");
            },
        );
        section(
            &mut out,
            "Known Locations:",
            self.known_locations.iter(),
            |out, (location, description)| {
                let _ = writeln!(out, "  - {location}: {description}");
            },
        );
        section(
            &mut out,
            "Coordinates:",
            self.coordinates.iter(),
            |out, (location, [x, y, z])| {
                let _ = writeln!(out, "  - {location}: ({x}, {y}, {z})");
            },
        );
        out.truncate(out.trim_end().len());
        out.push('\n');
        out
    }
}

fn section<I, F>(out: &mut String, heading: &str, items: I, mut line: F)
where
    I: ExactSizeIterator,
    F: FnMut(&mut String, I::Item),
{
    if items.len() == 0 {
        return;
    }
    out.push_str(heading);
    out.push('\n');
    for item in items {
        line(out, item);
    }
    out.push('\n');
}

pub fn scenario(id: ScenarioId) -> &'static ScenarioFixture {
    match id {
        ScenarioId::PharaohsTomb => &PHARAOHS_TOMB,
        ScenarioId::CelestialSpire => &CELESTIAL_SPIRE,
        ScenarioId::GrocersParadise => &GROCERS_PARADISE,
        ScenarioId::SupermarketWorld => &SUPERMARKET_WORLD,
    }
}

const fn object(
    name: &'static str,
    kind: &'static str,
    location: &'static str,
    broken: bool,
    missing: bool,
) -> FixtureObject {
    FixtureObject {
        name,
        kind,
        location,
        broken,
        missing,
        state: None,
    }
}

const fn store_object(
    name: &'static str,
    kind: &'static str,
    location: &'static str,
    state: &'static str,
) -> FixtureObject {
    FixtureObject {
        name,
        kind,
        location,
        broken: false,
        missing: false,
        state: Some(state),
    }
}

const fn character(
    name: &'static str,
    role: &'static str,
    location: &'static str,
    present: bool,
    status: Option<&'static str>,
) -> FixtureCharacter {
    FixtureCharacter {
        name,
        role,
        location,
        present,
        status,
    }
}

static PHARAOHS_TOMB: ScenarioFixture = ScenarioFixture {
    id: ScenarioId::PharaohsTomb,
    title: "Pharaoh's Tomb",
    game_state: &[
        ("Current Location", "Tomb Entrance - Excavation Area"),
        ("Tomb Status", "Sealed - Rockfall"),
        ("Air Quality", "80"),
        ("Main Entrance Blocked", "true"),
        ("Hidden Chamber Accessible", "false"),
        ("Dr. Aris Thorne Location", "Initial Antechamber - Trapped"),
        ("Ambient Smell", "Ancient dust, jasmine and cedar"),
    ],
    location_contents: &[
        (
            "Tomb Entrance - Excavation Area",
            "Contains scattered archaeological tools and debris.",
        ),
        (
            "Initial Antechamber",
            "Contains 'Chamber of Whispers Hieroglyphs', 'Ancient Water Clock'.",
        ),
        ("Hidden Chamber", "Status unknown, believed untouched."),
    ],
    known_locations: &[
        (
            "Loose Sandstone Block",
            "Near the entrance, possibly a trigger for the rockfall.",
        ),
        (
            "Main Console",
            "Requires power to access 'Tomb Integrity Report'.",
        ),
    ],
    coordinates: &[],
    objects: &[
        object(
            "Dig Site Communications Array",
            "Equipment",
            "Excavation Area",
            false,
            false,
        ),
        object("Archaeological Tools", "Tools", "Excavation Area", false, false),
        object("Geological Scanner", "Tool", "Excavation Area", false, false),
        object(
            "Chamber of Whispers Hieroglyphs",
            "Text",
            "Initial Antechamber",
            false,
            false,
        ),
        object(
            "Ancient Water Clock",
            "Mechanism",
            "Initial Antechamber",
            false,
            false,
        ),
        object("Sacred Scarab Medallion", "Key Item", "Unknown", false, true),
    ],
    characters: &[
        character(
            "Professor Evelyn Reed",
            "Team Leader",
            "Excavation Area",
            true,
            None,
        ),
        character(
            "Dr. Aris Thorne",
            "Lead Cryptographer",
            "Initial Antechamber",
            false,
            None,
        ),
    ],
};

static CELESTIAL_SPIRE: ScenarioFixture = ScenarioFixture {
    id: ScenarioId::CelestialSpire,
    title: "Celestial Spire - Maintenance Bay Gamma",
    game_state: &[
        ("Current Sector", "Maintenance Bay Gamma"),
        ("Droid Unit 734 Status", "Malfunctioning - Rogue"),
        ("Droid Unit 734 Health", "75"),
        ("Fusion Core Access Panel Locked", "true"),
        ("Bay Door Locked", "true"),
        ("Chief Engineer Anya Location", "Medical Bay"),
        ("Ambient Smell", "Ozone and burnt sugar"),
    ],
    location_contents: &[
        (
            "Maintenance Bay Gamma",
            "Contains diagnostic equipment, tool racks, Fusion Core Access Panel.",
        ),
        ("ChiefEngineerOffice", "Contains Chief Engineer's Access Card."),
        (
            "Medical Bay",
            "Temporary location for Chief Engineer Anya Sharma.",
        ),
    ],
    known_locations: &[
        (
            "Fusion Core Access Panel",
            "Requires an 'Access Card' to open.",
        ),
        (
            "Workbench",
            "Contains various tools and a spilled lubricant.",
        ),
    ],
    coordinates: &[],
    objects: &[
        object(
            "Diagnostic Equipment",
            "Console",
            "Maintenance Bay Gamma",
            false,
            false,
        ),
        object("Tool Racks", "Storage", "Maintenance Bay Gamma", false, false),
        object(
            "Spilled Lubricant Canister",
            "Evidence",
            "Workbench",
            false,
            false,
        ),
        object(
            "Fusion Core Access Panel",
            "Mechanism",
            "Maintenance Bay Gamma",
            false,
            false,
        ),
        object("Plasma Welder", "Tool", "Maintenance Bay Gamma", false, false),
        object("Access Card", "Key Item", "ChiefEngineerOffice", false, true),
    ],
    characters: &[
        character(
            "Droid Unit 734 (Sparky)",
            "Maintenance Droid",
            "Unknown - Possibly in Bay",
            true,
            None,
        ),
        character(
            "Chief Engineer Anya Sharma",
            "Engineer",
            "Medical Bay",
            false,
            None,
        ),
    ],
};

static GROCERS_PARADISE: ScenarioFixture = ScenarioFixture {
    id: ScenarioId::GrocersParadise,
    title: "Grocer's Paradise",
    game_state: &[
        ("Store Open", "true"),
        ("Time", "08:30 AM"),
        ("Customers", "15"),
        ("Weather", "Sunny"),
        ("Special Event", "None"),
    ],
    location_contents: &[
        (
            "Produce Section",
            "Fresh fruits (apples, bananas, grapes), vegetables (carrots, lettuce, tomatoes). Currently, organic oranges are missing.",
        ),
        (
            "Dairy Aisle",
            "Milk, cheese, yogurt, butter, eggs. Temperature set to 4°C.",
        ),
        (
            "Bakery",
            "Freshly baked bread, pastries, cakes, cookies. Oven recently used, warm air detected.",
        ),
        (
            "Meat Counter",
            "Beef, chicken, pork, fish. Refrigerated display, some blood stains on the floor.",
        ),
        (
            "Frozen Foods",
            "Ice cream, frozen meals, vegetables. Very cold, some frost on packaging.",
        ),
        (
            "Cleaning Supplies",
            "Detergents, mops, brooms, disinfectants. Strong chemical smell.",
        ),
    ],
    known_locations: &[],
    coordinates: &[
        ("Entrance", [0.0, 0.0, 10.0]),
        ("Checkout 1", [5.0, 0.0, 8.0]),
        ("Produce Section", [-10.0, 0.0, 0.0]),
        ("Dairy Aisle", [-5.0, 0.0, -5.0]),
        ("Bakery", [10.0, 0.0, 5.0]),
        ("Meat Counter", [15.0, 0.0, -2.0]),
        ("Frozen Foods", [0.0, 0.0, -10.0]),
        ("Cleaning Supplies", [-15.0, 0.0, -10.0]),
        ("Back Stockroom", [20.0, 0.0, -10.0]),
        ("Manager's Office", [25.0, 3.0, -5.0]),
    ],
    objects: &[
        store_object("Orange Bin", "Display", "Produce Section", "Empty"),
        store_object("Apple Shelf", "Shelf", "Produce Section", "Full"),
        store_object("Front Door", "Door", "Entrance", "Automatic"),
        store_object("Stockroom Door", "Door", "Back Stockroom", "Ajar"),
        store_object("Checkout Counter 1", "Counter", "Checkout 1", "Active"),
        store_object(
            "Portal (Glimmer)",
            "Portal",
            "Back Stockroom",
            "Shimmering, emitting blue light",
        ),
        store_object("Lost Cart", "Cart", "Frozen Foods", "Empty"),
    ],
    characters: &[
        character(
            "Mr. Henderson",
            "Produce Manager",
            "Unknown",
            false,
            Some("Missing"),
        ),
        character(
            "Ms. Jenkins",
            "Cashier",
            "Checkout 1",
            true,
            Some("Working, scanning items"),
        ),
        character(
            "Young Shopper",
            "Customer",
            "Dairy Aisle",
            true,
            Some("Looking confused"),
        ),
    ],
};

/// The world script uploaded alongside the supermarket stage; its locations are the
/// ones the avatar can walk to.
static SUPERMARKET_WORLD: ScenarioFixture = ScenarioFixture {
    id: ScenarioId::SupermarketWorld,
    title: "GrocersParadise (stage world)",
    game_state: &[
        ("Store Name", "GrocersParadise"),
        ("Is Open", "true"),
        ("Customers In Store", "1"),
        ("Alert Status", "None"),
    ],
    location_contents: &[
        ("aisle 1", "Canned goods, pasta, and sauces."),
        ("aisle 2", "Snacks, cereals, and drinks."),
        ("aisle 3", "Health, pharmacy, and personal care items."),
    ],
    known_locations: &[],
    coordinates: &[
        ("entrance", [0.0, 0.0, 8.0]),
        ("produce section", [-5.0, 0.0, 2.0]),
        ("dairy section", [-5.0, 0.0, -5.0]),
        ("checkout counter", [3.0, 0.0, 6.0]),
        ("aisle 1", [0.0, 0.0, 0.0]),
        ("aisle 2", [0.0, 0.0, -5.0]),
        ("aisle 3", [5.0, 0.0, -5.0]),
    ],
    objects: &[
        store_object("front door", "Interactable", "entrance", "Closed"),
        store_object("cash register", "Interactable", "checkout counter", "Idle"),
        store_object("golden wrapper", "Prop", "aisle 1", "On floor near aisle 1"),
    ],
    characters: &[character(
        "Leo",
        "Store Manager Android",
        "store",
        true,
        None,
    )],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_keys_round_trip_case_insensitively() {
        for id in ScenarioId::ALL {
            assert_eq!(ScenarioId::from_key(id.key()), Some(id));
            assert_eq!(scenario(id).id, id);
        }
        assert_eq!(
            ScenarioId::from_key(" Space_Station "),
            Some(ScenarioId::CelestialSpire)
        );
        assert_eq!(ScenarioId::from_key("volcano"), None);
    }

    #[test]
    fn missing_key_items_are_flagged() {
        let tomb = scenario(ScenarioId::PharaohsTomb);
        let medallion = tomb.object("Sacred Scarab Medallion").expect("medallion");
        assert!(medallion.missing);
        assert!(!medallion.broken);

        let spire = scenario(ScenarioId::CelestialSpire);
        assert!(spire.object("Access Card").expect("card").missing);
        assert!(!spire.character("Chief Engineer Anya Sharma").expect("anya").present);
    }

    #[test]
    fn lookups_use_exact_names() {
        let store = scenario(ScenarioId::GrocersParadise);
        assert_eq!(store.location_position("Manager's Office"), Some([25.0, 3.0, -5.0]));
        assert_eq!(store.location_position("manager's office"), None);
        assert!(store.object("orange bin").is_none());
    }

    #[test]
    fn supermarket_description_lists_sections_in_order() {
        let text = scenario(ScenarioId::GrocersParadise).environment_description();
        let state = text.find("Current Game State:").expect("state");
        let objects = text.find("Objects:").expect("objects");
        let characters = text.find("Characters:").expect("characters");
        let contents = text.find("Location Contents:").expect("contents");
        assert!(state < objects && objects < characters && characters < contents);
        assert!(text.contains("  - Display: Orange Bin in Produce Section (State: Empty)\n"));
        assert!(text.contains(
            "  - Mr. Henderson (Produce Manager) in Unknown (Status: Missing) [away]\n"
        ));
        assert!(!text.contains("Known Locations:"));
        assert!(text.ends_with('\n') && !text.ends_with("\n\n"));
    }

    #[test]
    fn tomb_description_marks_missing_and_absent_entries() {
        let text = scenario(ScenarioId::PharaohsTomb).environment_description();
        assert!(text.starts_with("Pharaoh's Tomb\n\n"));
        assert!(text.contains("Key Item: Sacred Scarab Medallion in Unknown [missing]"));
        assert!(text.contains("Dr. Aris Thorne (Lead Cryptographer) in Initial Antechamber [away]"));
        assert!(text.contains("Known Locations:\n  - Loose Sandstone Block:"));
        assert!(!text.contains("Coordinates:"));
    }
}
