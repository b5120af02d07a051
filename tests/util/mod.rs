//! Shared fixtures for the integration suites.

use std::sync::{Arc, Mutex};

use airea_search::model::{ListingIntent, Property, PropertyKind};

/// Captures tracing output so a test can assert on emitted events.
#[allow(dead_code)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl LogCapture {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || CaptureWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Chainable listing fixture with Klang Valley defaults.
#[allow(dead_code)]
#[derive(Clone)]
pub struct ListingBuilder {
    property: Property,
}

#[allow(dead_code)]
impl ListingBuilder {
    pub fn new(id: i64, title: &str, kind: PropertyKind, intent: ListingIntent) -> Self {
        Self {
            property: Property {
                id,
                title: title.to_string(),
                address: format!("{id} Jalan Ampang"),
                city: "Kuala Lumpur".to_string(),
                area: None,
                price: 1_500.0,
                kind,
                intent,
                bedrooms: Some(3),
                bathrooms: Some(2),
                square_feet: Some(950),
                amenities: Vec::new(),
                latitude: None,
                longitude: None,
                roi: None,
                featured: false,
                featured_until: None,
                distance_to_station: None,
                condition: None,
                lot_position: None,
                created_at: 0,
            },
        }
    }

    pub fn address(mut self, address: &str) -> Self {
        self.property.address = address.to_string();
        self
    }

    pub fn city(mut self, city: &str) -> Self {
        self.property.city = city.to_string();
        self
    }

    pub fn area(mut self, area: &str) -> Self {
        self.property.area = Some(area.to_string());
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.property.price = price;
        self
    }

    pub fn bedrooms(mut self, n: u32) -> Self {
        self.property.bedrooms = Some(n);
        self
    }

    pub fn bathrooms(mut self, n: u32) -> Self {
        self.property.bathrooms = Some(n);
        self
    }

    pub fn no_rooms(mut self) -> Self {
        self.property.bedrooms = None;
        self.property.bathrooms = None;
        self
    }

    pub fn square_feet(mut self, sqft: u32) -> Self {
        self.property.square_feet = Some(sqft);
        self
    }

    pub fn coords(mut self, lat: f64, lng: f64) -> Self {
        self.property.latitude = Some(lat);
        self.property.longitude = Some(lng);
        self
    }

    pub fn roi(mut self, roi: f64) -> Self {
        self.property.roi = Some(roi);
        self
    }

    pub fn amenity(mut self, amenity: &str) -> Self {
        self.property.amenities.push(amenity.to_string());
        self
    }

    pub fn created_at(mut self, ts: i64) -> Self {
        self.property.created_at = ts;
        self
    }

    pub fn build(self) -> Property {
        self.property
    }
}

/// Standard inventory shared by the end-to-end suites: two Mont Kiara sale
/// condos, three rentals around KLCC, one far-flung rental, one investment
/// shop lot, one Taman Maluri rental.
#[allow(dead_code)]
pub fn inventory() -> Vec<Property> {
    vec![
        ListingBuilder::new(
            1,
            "Kiara Designer Suites",
            PropertyKind::Condominium,
            ListingIntent::Sale,
        )
        .area("Mont Kiara")
        .price(480_000.0)
        .square_feet(1_180)
        .coords(3.1702, 101.6521)
        .amenity("Pool")
        .created_at(100)
        .build(),
        ListingBuilder::new(
            2,
            "Arte Mont Kiara",
            PropertyKind::Condominium,
            ListingIntent::Sale,
        )
        .area("Mont Kiara")
        .price(650_000.0)
        .bedrooms(2)
        .coords(3.1745, 101.6488)
        .created_at(200)
        .build(),
        ListingBuilder::new(3, "Vista Damai", PropertyKind::Apartment, ListingIntent::Rent)
            .area("KLCC")
            .price(2_300.0)
            .bedrooms(2)
            .coords(3.1612, 101.7180)
            .created_at(300)
            .build(),
        ListingBuilder::new(
            4,
            "Parkview Serviced Suites",
            PropertyKind::Apartment,
            ListingIntent::Rent,
        )
        .area("KLCC")
        .price(3_800.0)
        .bedrooms(1)
        .bathrooms(1)
        .coords(3.1590, 101.7140)
        .created_at(400)
        .build(),
        ListingBuilder::new(5, "The Stonor", PropertyKind::Condominium, ListingIntent::Rent)
            .area("KLCC")
            .price(2_800.0)
            .coords(3.1555, 101.7165)
            .created_at(500)
            .build(),
        ListingBuilder::new(
            6,
            "Bayu Tasik Apartment",
            PropertyKind::Apartment,
            ListingIntent::Rent,
        )
        .area("Bandar Sri Permaisuri")
        .price(1_400.0)
        .coords(3.0450, 101.7560)
        .created_at(600)
        .build(),
        ListingBuilder::new(7, "Cendana Shop Lot", PropertyKind::ShopLot, ListingIntent::Sale)
            .address("12 Jalan Cendana")
            .price(880_000.0)
            .no_rooms()
            .roi(5.1)
            .coords(3.1480, 101.7050)
            .created_at(700)
            .build(),
        ListingBuilder::new(8, "Maluri Vista", PropertyKind::Condominium, ListingIntent::Rent)
            .area("Taman Maluri")
            .price(2_600.0)
            .bedrooms(2)
            .coords(3.1302, 101.7280)
            .created_at(800)
            .build(),
    ]
}
