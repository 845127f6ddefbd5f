use serde::{Deserialize, Serialize};

/// Localized string with Russian and English values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizedString {
    pub ru: String,
    pub en: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct City {
    pub id: i64,
    pub name_ru: String,
    pub name_en: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Building {
    pub id: i64,
    pub city_id: i64,
    pub address_ru: String,
    pub address_en: String,
    pub floor_count: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Auditorium {
    pub id: i64,
    pub building_id: i64,
    pub floor_number: i32,
    pub capacity: i32,
    pub auditorium_number: String,
    pub r#type: String,
    pub type_ru: String,
    pub image_url: String,
}

/// JSON response shape for a city
#[derive(Debug, Clone, Serialize)]
pub struct CityResponse {
    pub id: i64,
    pub name: LocalizedString,
}

/// JSON response shape for a building
#[derive(Debug, Clone, Serialize)]
pub struct BuildingResponse {
    pub id: i64,
    pub address: LocalizedString,
    pub floors_count: i32,
    pub city_id: i64,
}

/// JSON response shape for an auditorium
#[derive(Debug, Clone, Serialize)]
pub struct AuditoriumResponse {
    pub id: i64,
    pub floor_number: i32,
    pub capacity: i32,
    pub auditorium_number: String,
    pub r#type: LocalizedString,
    pub image_url: String,
}

impl From<City> for CityResponse {
    fn from(city: City) -> Self {
        Self {
            id: city.id,
            name: LocalizedString {
                ru: city.name_ru,
                en: city.name_en,
            },
        }
    }
}

impl From<Building> for BuildingResponse {
    fn from(building: Building) -> Self {
        Self {
            id: building.id,
            address: LocalizedString {
                ru: building.address_ru,
                en: building.address_en,
            },
            floors_count: building.floor_count,
            city_id: building.city_id,
        }
    }
}

impl From<Auditorium> for AuditoriumResponse {
    fn from(auditorium: Auditorium) -> Self {
        Self {
            id: auditorium.id,
            floor_number: auditorium.floor_number,
            capacity: auditorium.capacity,
            auditorium_number: auditorium.auditorium_number,
            r#type: LocalizedString {
                ru: auditorium.type_ru,
                en: auditorium.r#type,
            },
            image_url: auditorium.image_url,
        }
    }
}
