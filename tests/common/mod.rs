//! In-memory collaborator fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};

use chrono::Days;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use abrechnung::core::BillingError;
use abrechnung::invoice::{DraftInvoice, InvoiceStore, ScheduleEntry, TaxLine};
use abrechnung::masterdata::{
    CustomerRecord, ItemPricing, ItemRecord, MasterData, PriceListEntry, PricingArgs,
    PricingEngine, ProductRecord, ServerRecord, Settings, relaxed_eq,
};
use abrechnung::run::{BillingRun, RunStore};

/// Build an in-memory ZIP with the given (name, content) members.
pub fn zip_archive(files: &[(&str, &str)]) -> Cursor<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    let mut cursor = writer.finish().unwrap();
    cursor.set_position(0);
    cursor
}

#[derive(Default)]
pub struct FakeMasterData {
    pub servers: Vec<ServerRecord>,
    pub products: HashMap<String, ProductRecord>,
    pub items: HashMap<String, ItemRecord>,
    pub customers: HashMap<String, CustomerRecord>,
    /// (item_code, entry) rows across all price lists.
    pub prices: Vec<(String, PriceListEntry)>,
    pub selling_default: Option<String>,
    pub price_lists: Vec<String>,
    pub currencies: HashMap<String, String>,
    pub company_currency: Option<String>,
}

impl FakeMasterData {
    pub fn add_server(&mut self, name: &str, server_id: &str, product: &str, customer: &str) {
        self.servers.push(ServerRecord {
            name: name.to_string(),
            server_id: server_id.to_string(),
            product: product.to_string(),
            customer: customer.to_string(),
        });
    }

    pub fn add_product(&mut self, name: &str, item: &str) {
        self.products.insert(
            name.to_string(),
            ProductRecord {
                name: name.to_string(),
                item: item.to_string(),
            },
        );
        self.items.entry(item.to_string()).or_insert(ItemRecord {
            code: item.to_string(),
            uom: Some("Stk".to_string()),
        });
    }

    pub fn add_customer(
        &mut self,
        name: &str,
        display: &str,
        price_list: Option<&str>,
        payment_terms: Option<&str>,
    ) {
        self.customers.insert(
            name.to_string(),
            CustomerRecord {
                name: name.to_string(),
                customer_name: display.to_string(),
                default_price_list: price_list.map(str::to_string),
                payment_terms: payment_terms.map(str::to_string),
            },
        );
    }

    pub fn add_price(&mut self, item: &str, list: &str, rate: Decimal) {
        if !self.price_lists.iter().any(|l| l == list) {
            self.price_lists.push(list.to_string());
        }
        self.prices.push((
            item.to_string(),
            PriceListEntry {
                price_list: list.to_string(),
                rate,
                currency: Some("EUR".to_string()),
            },
        ));
    }
}

impl MasterData for FakeMasterData {
    fn servers_by_id(&self, identifier: &str) -> Result<Vec<ServerRecord>, BillingError> {
        Ok(self
            .servers
            .iter()
            .filter(|s| s.server_id == identifier)
            .cloned()
            .collect())
    }

    fn servers_by_id_relaxed(&self, identifier: &str) -> Result<Vec<ServerRecord>, BillingError> {
        Ok(self
            .servers
            .iter()
            .filter(|s| relaxed_eq(&s.server_id, identifier))
            .cloned()
            .collect())
    }

    fn product(&self, name: &str) -> Result<ProductRecord, BillingError> {
        self.products
            .get(name)
            .cloned()
            .ok_or_else(|| BillingError::MasterData(format!("unknown product '{name}'")))
    }

    fn item(&self, name: &str) -> Result<ItemRecord, BillingError> {
        self.items
            .get(name)
            .cloned()
            .ok_or_else(|| BillingError::MasterData(format!("unknown item '{name}'")))
    }

    fn customer(&self, name: &str) -> Result<CustomerRecord, BillingError> {
        self.customers
            .get(name)
            .cloned()
            .ok_or_else(|| BillingError::MasterData(format!("unknown customer '{name}'")))
    }

    fn default_selling_price_list(&self) -> Result<Option<String>, BillingError> {
        Ok(self.selling_default.clone())
    }

    fn price_list_exists(&self, name: &str) -> Result<bool, BillingError> {
        Ok(self.price_lists.iter().any(|l| l == name))
    }

    fn price_list_entry(
        &self,
        item_code: &str,
        price_list: &str,
    ) -> Result<Option<PriceListEntry>, BillingError> {
        Ok(self
            .prices
            .iter()
            .find(|(item, entry)| item == item_code && entry.price_list == price_list)
            .map(|(_, entry)| entry.clone()))
    }

    fn any_price_list_entry(
        &self,
        item_code: &str,
    ) -> Result<Option<PriceListEntry>, BillingError> {
        Ok(self
            .prices
            .iter()
            .find(|(item, _)| item == item_code)
            .map(|(_, entry)| entry.clone()))
    }

    fn price_list_currency(&self, price_list: &str) -> Result<Option<String>, BillingError> {
        Ok(self.currencies.get(price_list).cloned())
    }

    fn company_currency(&self, _company: &str) -> Result<Option<String>, BillingError> {
        Ok(self.company_currency.clone())
    }
}

pub struct FakePricingEngine {
    pub rate: Option<Decimal>,
    pub fail: bool,
}

impl PricingEngine for FakePricingEngine {
    fn item_details(&self, _args: &PricingArgs) -> Result<ItemPricing, BillingError> {
        if self.fail {
            return Err(BillingError::Pricing("engine down".to_string()));
        }
        Ok(ItemPricing {
            rate: self.rate,
            price_list_rate: self.rate,
            discount_percentage: None,
            uom: None,
        })
    }
}

#[derive(Default)]
pub struct FakeTaxResolver {
    pub template: Option<String>,
    pub lines: Vec<TaxLine>,
    pub fail_template: bool,
    pub fail_lines: bool,
}

impl FakeTaxResolver {
    pub fn with_standard_vat() -> Self {
        Self {
            template: Some("USt 19%".to_string()),
            lines: vec![TaxLine {
                charge_type: "On Net Total".to_string(),
                account_head: "1776 - USt 19%".to_string(),
                rate: dec!(19),
                description: "Umsatzsteuer 19%".to_string(),
            }],
            fail_template: false,
            fail_lines: false,
        }
    }
}

impl abrechnung::masterdata::TaxResolver for FakeTaxResolver {
    fn tax_template(
        &self,
        _customer: &str,
        _posting_date: chrono::NaiveDate,
        _company: Option<&str>,
    ) -> Result<Option<String>, BillingError> {
        if self.fail_template {
            return Err(BillingError::Tax("resolver down".to_string()));
        }
        Ok(self.template.clone())
    }

    fn template_lines(&self, template: &str) -> Result<Vec<TaxLine>, BillingError> {
        if self.fail_lines {
            return Err(BillingError::Tax(format!("cannot load template '{template}'")));
        }
        Ok(self.lines.clone())
    }
}

#[derive(Default)]
pub struct FakeInvoiceStore {
    pub inserted: Vec<DraftInvoice>,
    /// When set, `recompute_schedule` emulates the external document's
    /// own schedule logic with a single full portion after N days.
    pub schedule_days: Option<u64>,
}

impl InvoiceStore for FakeInvoiceStore {
    fn find_existing(
        &self,
        customer: &str,
        title: &str,
        marker: &str,
    ) -> Result<Option<String>, BillingError> {
        Ok(self
            .inserted
            .iter()
            .position(|inv| {
                inv.customer == customer && inv.title == title && inv.introduction.contains(marker)
            })
            .map(|i| format!("ACC-SINV-{:05}", i + 1)))
    }

    fn recompute_schedule(&self, draft: &mut DraftInvoice) -> Result<(), BillingError> {
        if let Some(days) = self.schedule_days {
            draft.payment_schedule.push(ScheduleEntry {
                due_date: draft.posting_date + Days::new(days),
                invoice_portion: dec!(100),
            });
        }
        Ok(())
    }

    fn insert(&mut self, draft: DraftInvoice) -> Result<String, BillingError> {
        self.inserted.push(draft);
        Ok(format!("ACC-SINV-{:05}", self.inserted.len()))
    }
}

#[derive(Default)]
pub struct FakeRunStore {
    pub runs: Vec<BillingRun>,
}

impl RunStore for FakeRunStore {
    fn find_run_for_period(&self, period_key: &str) -> Result<Option<String>, BillingError> {
        Ok(self
            .runs
            .iter()
            .position(|r| !r.period_key.is_empty() && r.period_key == period_key)
            .map(|i| format!("ABR-{:04}", i + 1)))
    }

    fn save(&mut self, run: &BillingRun) -> Result<(), BillingError> {
        self.runs.push(run.clone());
        Ok(())
    }
}

/// Standard settings fixture.
pub fn settings() -> Settings {
    Settings {
        introduction_text: "<p>Vielen Dank für Ihren Auftrag.</p>".to_string(),
        introduction_text_mxdr: Some("<p>Abrechnung Ihrer MXDR-Lizenzen.</p>".to_string()),
        terms_and_conditions: Some("AGB Standard".to_string()),
        payment_terms_template: Some("Zahlung 14 Tage netto".to_string()),
        company: Some("Muster GmbH".to_string()),
    }
}

/// Standard master data: two MES servers for two customers plus one
/// MXDR license, priced over two lists.
pub fn masterdata() -> FakeMasterData {
    let mut md = FakeMasterData {
        company_currency: Some("EUR".to_string()),
        ..FakeMasterData::default()
    };
    md.add_product("MES Produkt", "MES-CLIENT");
    md.add_product("MXDR Produkt", "MXDR-CLIENT");
    md.add_customer(
        "KD-0001",
        "Kunde AG",
        Some("Kundenliste"),
        Some("Zahlung 7 Tage"),
    );
    md.add_customer("KD-0002", "Beispiel GmbH", None, None);
    md.add_server("MS-0001", "SRV-1", "MES Produkt", "KD-0001");
    md.add_server("MS-0002", "SRV-2", "MES Produkt", "KD-0002");
    md.add_server("MS-0003", "K1", "MXDR Produkt", "KD-0001");
    md.add_price("MES-CLIENT", "Kundenliste", dec!(2.50));
    md.add_price("MES-CLIENT", "Standard Selling", dec!(3.00));
    md.add_price("MXDR-CLIENT", "Kundenliste", dec!(5.00));
    md.currencies
        .insert("Kundenliste".to_string(), "EUR".to_string());
    md
}
