/// Background tile source option
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Basemap {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
    pub max_zoom: u8,
}

pub const DEFAULT_BASEMAP: &str = "osm";

pub const BASEMAPS: [Basemap; 4] = [
    Basemap {
        id: "osm",
        name: "OpenStreetMap",
        url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
        attribution: "© OpenStreetMap contributors",
        max_zoom: 19,
    },
    Basemap {
        id: "topo",
        name: "Topografi",
        url: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
        attribution: "Map data: © OpenStreetMap contributors, SRTM | Map style: © OpenTopoMap",
        max_zoom: 17,
    },
    Basemap {
        id: "satellite",
        name: "Satelit",
        url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        attribution: "Tiles © Esri",
        max_zoom: 19,
    },
    Basemap {
        id: "terrain",
        name: "Terrain",
        url: "https://stamen-tiles-{s}.a.ssl.fastly.net/terrain/{z}/{x}/{y}.jpg",
        attribution: "Map tiles by Stamen Design, CC BY 3.0. Map data © OpenStreetMap contributors",
        max_zoom: 18,
    },
];

/// Look up a basemap by id
pub fn find(id: &str) -> Option<&'static Basemap> {
    BASEMAPS.iter().find(|b| b.id == id)
}

/// Basemap by id, falling back to the first entry for unknown ids
pub fn find_or_default(id: &str) -> &'static Basemap {
    find(id).unwrap_or(&BASEMAPS[0])
}

/// The basemap after `id` in catalog order, wrapping around
pub fn next(id: &str) -> &'static Basemap {
    let idx = BASEMAPS.iter().position(|b| b.id == id).unwrap_or(0);
    &BASEMAPS[(idx + 1) % BASEMAPS.len()]
}
