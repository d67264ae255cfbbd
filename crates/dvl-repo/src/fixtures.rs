//! Record types shared by the repository tests.

use chrono::{Duration, TimeZone, Utc};
use dvl_crypto::KeyHasher;
use dvl_types::{
    DataVaultObject, EntityKind, HashFunction, Hub, Link, LoadDate, LoadReference, Satellite,
    SatelliteKey, StoreLoadInfo, TimelineLink, TimelineSatellite, ValueHashedSatellite,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Load date `offset` seconds after the fixture epoch.
pub fn t(offset: i64) -> LoadDate {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + Duration::seconds(offset)
}

pub fn hub_hash() -> HashFunction<String> {
    KeyHasher::HUB.function()
}

pub fn link_hash() -> HashFunction<String> {
    KeyHasher::LINK.function()
}

pub fn value_hash() -> HashFunction<String> {
    KeyHasher::VALUE.function()
}

/// A business key no other test uses.
pub fn unique_number() -> String {
    format!("CUST-{}", uuid::Uuid::now_v7())
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerHub {
    pub key: Option<String>,
    pub number: String,
    pub load_date: LoadDate,
    pub record_source: Option<String>,
    pub loaded_by: Option<String>,
    pub load_reference: Option<LoadReference>,
    pub edited_by: Option<String>,
}

impl CustomerHub {
    pub fn new(number: &str) -> Self {
        Self {
            number: number.to_string(),
            ..Default::default()
        }
    }
}

impl DataVaultObject for CustomerHub {
    type Key = String;
    const KIND: EntityKind = EntityKind::new("h_customer");

    fn primary_key(&self) -> Option<String> {
        self.key.clone()
    }
    fn load_date(&self) -> LoadDate {
        self.load_date
    }
    fn set_load_date(&mut self, load_date: LoadDate) {
        self.load_date = load_date;
    }
    fn business_key_string(&self) -> String {
        self.number.clone()
    }
    fn set_store_load_info(&mut self, info: &StoreLoadInfo) {
        self.record_source = Some(info.record_source.clone());
        self.loaded_by = Some(info.loaded_by.clone());
    }
    fn set_load_reference(&mut self, reference: LoadReference) {
        self.load_reference = Some(reference);
    }
    fn set_edited_by(&mut self, editor: &str) {
        self.edited_by = Some(editor.to_string());
    }
}

impl Hub for CustomerHub {
    fn set_primary_key(&mut self, key: String) {
        self.key = Some(key);
    }
}

// ---------------------------------------------------------------------------
// Link with timeline
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerOrderLink {
    pub key: Option<String>,
    pub customer: String,
    pub order: String,
    pub load_date: LoadDate,
}

impl CustomerOrderLink {
    pub fn new(customer: &str, order: &str) -> Self {
        Self {
            customer: customer.to_string(),
            order: order.to_string(),
            ..Default::default()
        }
    }
}

impl DataVaultObject for CustomerOrderLink {
    type Key = String;
    const KIND: EntityKind = EntityKind::new("l_customer_order");

    fn primary_key(&self) -> Option<String> {
        self.key.clone()
    }
    fn load_date(&self) -> LoadDate {
        self.load_date
    }
    fn set_load_date(&mut self, load_date: LoadDate) {
        self.load_date = load_date;
    }
    fn business_key_string(&self) -> String {
        format!("{}{}", self.customer, self.order)
    }
}

impl Link for CustomerOrderLink {
    fn set_primary_key(&mut self, key: String) {
        self.key = Some(key);
    }
}

impl TimelineLink for CustomerOrderLink {
    type Timeline = CustomerOrderTimeline;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerOrderTimeline {
    pub link: Option<String>,
    pub load_date: LoadDate,
    pub end_date: Option<LoadDate>,
    pub loaded_by: Option<String>,
}

impl DataVaultObject for CustomerOrderTimeline {
    type Key = SatelliteKey<String>;
    const KIND: EntityKind = EntityKind::new("s_customer_order_timeline");

    fn primary_key(&self) -> Option<Self::Key> {
        SatelliteKey::of(self)
    }
    fn load_date(&self) -> LoadDate {
        self.load_date
    }
    fn set_load_date(&mut self, load_date: LoadDate) {
        self.load_date = load_date;
    }
    fn business_key_string(&self) -> String {
        String::new()
    }
    fn set_store_load_info(&mut self, info: &StoreLoadInfo) {
        self.loaded_by = Some(info.loaded_by.clone());
    }
}

impl Satellite for CustomerOrderTimeline {
    type Reference = String;

    fn reference(&self) -> Option<&String> {
        self.link.as_ref()
    }
    fn set_reference(&mut self, reference: String) {
        self.link = Some(reference);
    }
}

impl TimelineSatellite for CustomerOrderTimeline {
    fn open(reference: String, load_date: LoadDate) -> Self {
        Self {
            link: Some(reference),
            load_date,
            ..Default::default()
        }
    }
    fn end_date(&self) -> Option<LoadDate> {
        self.end_date
    }
    fn set_end_date(&mut self, end_date: Option<LoadDate>) {
        self.end_date = end_date;
    }
}

// ---------------------------------------------------------------------------
// Satellites
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerName {
    pub customer: Option<String>,
    pub number: String,
    pub name: String,
    pub load_date: LoadDate,
}

impl CustomerName {
    pub fn new(number: &str, name: &str) -> Self {
        Self {
            number: number.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl DataVaultObject for CustomerName {
    type Key = SatelliteKey<String>;
    const KIND: EntityKind = EntityKind::new("s_customer_name");

    fn primary_key(&self) -> Option<Self::Key> {
        SatelliteKey::of(self)
    }
    fn load_date(&self) -> LoadDate {
        self.load_date
    }
    fn set_load_date(&mut self, load_date: LoadDate) {
        self.load_date = load_date;
    }
    fn business_key_string(&self) -> String {
        self.number.clone()
    }
}

impl Satellite for CustomerName {
    type Reference = String;

    fn reference(&self) -> Option<&String> {
        self.customer.as_ref()
    }
    fn set_reference(&mut self, reference: String) {
        self.customer = Some(reference);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerAddress {
    pub customer: Option<String>,
    pub number: String,
    pub street: String,
    pub city: String,
    pub value_hash: Option<String>,
    pub load_date: LoadDate,
}

impl CustomerAddress {
    pub fn new(number: &str, street: &str, city: &str) -> Self {
        Self {
            number: number.to_string(),
            street: street.to_string(),
            city: city.to_string(),
            ..Default::default()
        }
    }
}

impl DataVaultObject for CustomerAddress {
    type Key = SatelliteKey<String>;
    const KIND: EntityKind = EntityKind::new("s_customer_address");

    fn primary_key(&self) -> Option<Self::Key> {
        SatelliteKey::of(self)
    }
    fn load_date(&self) -> LoadDate {
        self.load_date
    }
    fn set_load_date(&mut self, load_date: LoadDate) {
        self.load_date = load_date;
    }
    fn business_key_string(&self) -> String {
        self.number.clone()
    }
}

impl Satellite for CustomerAddress {
    type Reference = String;

    fn reference(&self) -> Option<&String> {
        self.customer.as_ref()
    }
    fn set_reference(&mut self, reference: String) {
        self.customer = Some(reference);
    }
}

impl ValueHashedSatellite for CustomerAddress {
    type ValueHash = String;

    fn value_string(&self) -> String {
        format!("{}{}", self.street, self.city)
    }
    fn value_hash(&self) -> Option<&String> {
        self.value_hash.as_ref()
    }
    fn set_value_hash(&mut self, hash: String) {
        self.value_hash = Some(hash);
    }
}
