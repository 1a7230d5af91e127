use confique::Config;

/// Contents of the `/info` endpoint
#[derive(Debug, Config, Clone)]
pub struct InfoConfig {
    /// Include `productId` in `/info` (default: false)
    #[config(env = "HMPPS_INFO_PRODUCT_ID_ENABLED", default = false)]
    pub product_id_enabled: bool,

    /// Service catalogue product id (default: "default")
    #[config(env = "HMPPS_INFO_PRODUCT_ID", default = "default")]
    pub product_id: String,
}
