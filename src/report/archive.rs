use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::core::BillingError;

/// One XML member extracted from the vendor ZIP.
#[derive(Debug, Clone)]
pub struct XmlMember {
    /// Member name as stored in the archive, including any path.
    pub name: String,
    /// Raw member bytes.
    pub bytes: Vec<u8>,
}

/// Extract every member whose lowercased name ends in `.xml`, in archive
/// order. An archive without any such member yields an empty list — the
/// orchestrator surfaces that as [`BillingError::NoXmlMember`].
pub fn extract_xml_members<R: Read + Seek>(reader: R) -> Result<Vec<XmlMember>, BillingError> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| BillingError::Archive(format!("failed to open ZIP: {e}")))?;

    let mut members = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| BillingError::Archive(format!("failed to read ZIP member {i}: {e}")))?;
        if !file.name().to_lowercase().ends_with(".xml") {
            continue;
        }
        let mut bytes = Vec::with_capacity(file.size() as usize);
        let name = file.name().to_string();
        file.read_to_end(&mut bytes)
            .map_err(|e| BillingError::Archive(format!("failed to read '{name}': {e}")))?;
        members.push(XmlMember { name, bytes });
    }
    Ok(members)
}

/// Pick the member to bill from. Vendor deliveries bundle multiple
/// equivalent exports; the aggregate ("short") form is the cheapest to
/// bill from, the detailed form the next best, else the first member.
pub fn choose_member(members: &[XmlMember]) -> Option<&XmlMember> {
    members
        .iter()
        .find(|m| m.name.to_lowercase().contains("short"))
        .or_else(|| {
            members
                .iter()
                .find(|m| m.name.to_lowercase().contains("detailed"))
        })
        .or_else(|| members.first())
}
