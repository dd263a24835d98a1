//! Build-time configuration for the Heltec WiFi LoRa 32 V3 (ESP32-S3 + SX1262)

/// LED pin (on while a packet is being sent)
pub mod led {
    pub const PIN: u8 = 35;
}

/// Vext rail switch, powers the OLED (active low)
pub mod vext {
    pub const PIN: u8 = 36;
}

/// SPI pins for LoRa module
pub mod spi {
    pub const SCLK: u8 = 9;
    pub const MISO: u8 = 11;
    pub const MOSI: u8 = 10;
}

/// LoRa control pins
pub mod lora_pins {
    pub const NSS: u8 = 8;
    pub const DIO1: u8 = 14;
    pub const NRST: u8 = 12;
    pub const BUSY: u8 = 13;
}

/// TCXO configuration
pub mod tcxo {
    /// TCXO voltage code for SX1262 register
    /// 0x02 = 1.8V
    pub const VOLTAGE_CODE: u8 = 0x02;
}

/// SSD1306 OLED on I2C
pub mod oled {
    pub const ADDRESS: u8 = 0x3c;
    pub const SDA: u8 = 17;
    pub const SCL: u8 = 18;
    pub const RST: u8 = 21;
    pub const WIDTH: u32 = 128;
    pub const HEIGHT: u32 = 64;
    /// Low time of the reset pulse
    pub const RESET_PULSE_MS: u32 = 50;
    /// How long the logo and the banner stay up at boot
    pub const SPLASH_MS: u64 = 2000;
}

/// Serial logging
pub mod serial {
    pub const BAUD_RATE: u32 = 115200;
}

/// Statically provisioned ABP session
pub mod session {
    /// LoRaWAN NwkSKey, network session key
    pub const NWK_SKEY: [u8; 16] = [
        0xD6, 0x6D, 0xC7, 0x16, 0xE7, 0x90, 0xB8, 0x39, 0x8A, 0x6A, 0xE9, 0xA4, 0x15, 0x48, 0x21,
        0x69,
    ];

    /// LoRaWAN AppSKey, application session key
    pub const APP_SKEY: [u8; 16] = [
        0x29, 0x0E, 0x5C, 0xF7, 0xA1, 0x41, 0x3C, 0x5A, 0x8B, 0xF9, 0x12, 0x96, 0xE3, 0xBA, 0x54,
        0x40,
    ];

    /// LoRaWAN end-device address (DevAddr)
    pub const DEV_ADDR: u32 = 0x2604_1938;

    /// Network identifier passed along with the session
    pub const SESSION_ID: u32 = 0x1;
}

/// Channel plan
pub mod channels {
    /// Number of US915 channels (64 x 125 kHz + 8 x 500 kHz)
    pub const COUNT: u8 = 72;

    /// The one channel left enabled (905.5 MHz)
    pub const ENABLED: u8 = 16;
}

/// Radio and MAC timing parameters
pub mod radio {
    use crate::region::DataRate;

    /// Radio clock resolution
    pub const TICKS_PER_SEC: u64 = 32_768;

    /// Uplink data rate (SF7 / 125 kHz)
    pub const UPLINK_DATA_RATE: DataRate = DataRate::Dr3;

    /// RX2 data rate (SF9 / 125 kHz)
    pub const RX2_DATA_RATE: DataRate = DataRate::Dr1;

    pub const TX_POWER_DBM: i8 = 14;

    /// Coding rate 4/5
    pub const CODING_RATE: u8 = 5;

    pub const PREAMBLE_SYMBOLS: u16 = 8;

    /// RX1 opens this long after the end of the uplink, RX2 one second later
    pub const RECEIVE_DELAY1_MS: u32 = 1000;
    pub const RECEIVE_DELAY2_MS: u32 = 2000;

    /// How long each receive window listens for a preamble
    pub const RX_WINDOW_MS: u32 = 500;

    /// Sleep between polls when the engine has nothing to do
    pub const IDLE_POLL_MS: u32 = 10;

    /// Share of airtime allowed on the band
    pub const DUTY_CYCLE_PERCENT: u32 = 1;

    /// Uplinks without any downlink before link check reports the link as dead
    pub const LINK_DEAD_AFTER: u32 = 96;
}

/// Application settings
pub mod app {
    /// Fixed payload sent on every uplink
    pub const PAYLOAD: &[u8] = b"Hello, world!";

    /// Application port (1-223, others reserved)
    pub const PORT: u8 = 1;

    /// Acks consume a lot of network resources; don't ask for one
    pub const REQUEST_ACK: bool = false;

    /// Seconds between the end of one cycle and the next send
    /// (may become longer due to duty cycle limitations)
    pub const TX_INTERVAL_SECS: u32 = 10;

    pub const LINK_CHECK: bool = false;
}

/// Protocol limits
pub mod protocol {
    /// Maximum PHY payload size for LoRa
    pub const MAX_LORA_PAYLOAD: usize = 255;

    /// Largest FRMPayload we will carry (US915 DR3 application payload limit)
    pub const MAX_APP_PAYLOAD: usize = 242;
}
