use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteRequest {
    pub md5_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaketQuery {
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for PaketQuery {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            limit: 10,
        }
    }
}

impl PaketQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(q) = self.search.as_deref().filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_string()));
        }
        pairs
    }
}

/// Procurement package as accepted by `POST /api/paket`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPaket {
    pub nama_paket: String,
    pub kode_paket: String,
    pub nilai_pagu_paket: f64,
    pub file_name: String,
    pub md5_hash: String,
    pub tanggal_pembuatan: String,
    pub tanggal_penutupan: Option<String>,
    pub kl_pd_instansi: String,
    pub satuan_kerja: String,
    pub jenis_pengadaan: String,
    pub metode_pengadaan: String,
    pub nilai_hps_paket: f64,
    pub lokasi_pekerjaan: String,
    pub syarat_kualifikasi: String,
    pub peserta_non_tender: String,
    pub html_content: String,
}

impl NewPaket {
    /// Fills every optional field with the defaults the API expects.
    /// `stamp` keeps the generated hash unique across runs.
    pub fn with_defaults(
        nama_paket: impl Into<String>,
        kode_paket: impl Into<String>,
        nilai_pagu_paket: f64,
        stamp: i64,
    ) -> Self {
        let nama_paket = nama_paket.into();
        let kode_paket = kode_paket.into();
        Self {
            file_name: format!("paket_{kode_paket}.pdf"),
            md5_hash: format!("hash_{kode_paket}_{stamp}"),
            tanggal_pembuatan: "2024-01-01".to_string(),
            tanggal_penutupan: None,
            kl_pd_instansi: "Dinas Teknologi".to_string(),
            satuan_kerja: "Bagian IT".to_string(),
            jenis_pengadaan: "Barang".to_string(),
            metode_pengadaan: "Tender Terbuka".to_string(),
            nilai_hps_paket: nilai_pagu_paket * 0.9,
            lokasi_pekerjaan: "Jakarta".to_string(),
            syarat_kualifikasi: "Perusahaan harus memiliki SIUP dan NPWP".to_string(),
            peserta_non_tender: "Tidak ada".to_string(),
            html_content: format!("<p>Detail pengadaan {nama_paket}</p>"),
            nama_paket,
            kode_paket,
            nilai_pagu_paket,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_paket_defaults() {
        let paket = NewPaket::with_defaults("Laptop", "LP01", 1_000_000.0, 1_700_000_000);
        assert_eq!(paket.file_name, "paket_LP01.pdf");
        assert_eq!(paket.md5_hash, "hash_LP01_1700000000");
        assert!((paket.nilai_hps_paket - 900_000.0).abs() < 1e-6);
        assert_eq!(paket.html_content, "<p>Detail pengadaan Laptop</p>");
    }

    #[test]
    fn password_change_uses_camel_case_keys() {
        let body = serde_json::to_value(PasswordChange {
            current_password: "a".to_string(),
            new_password: "b".to_string(),
        })
        .unwrap_or_else(|e| panic!("encode: {e}"));
        assert_eq!(body, json!({"currentPassword": "a", "newPassword": "b"}));
    }

    #[test]
    fn unset_profile_fields_are_omitted() {
        let body = serde_json::to_value(ProfileUpdate {
            full_name: Some("X".to_string()),
            ..ProfileUpdate::default()
        })
        .unwrap_or_else(|e| panic!("encode: {e}"));
        assert_eq!(body, json!({"full_name": "X"}));
    }

    #[test]
    fn query_pairs_include_search_only_when_set() {
        assert_eq!(
            PaketQuery::default().pairs(),
            vec![("page", "1".to_string()), ("limit", "10".to_string())]
        );
        let pairs = PaketQuery::search("Laptop").pairs();
        assert_eq!(pairs.last(), Some(&("q", "Laptop".to_string())));
    }
}
