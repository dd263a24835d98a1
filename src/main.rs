#![no_std]
#![no_main]

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use esp_backtrace as _;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::spi::Mode as SpiMode;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::{Async, Blocking};
use log::{error, info, LevelFilter};
use ssd1306::prelude::I2CInterface;
use ssd1306::I2CDisplayInterface;
use static_cell::StaticCell;

use lora_abp_sender::config::{oled, serial};
use lora_abp_sender::debug;
use lora_abp_sender::lora::driver::{Sx1262Driver, Sx1262Pins};
use lora_abp_sender::lora::{EmbassyClock, LoraWanEngine};
use lora_abp_sender::node::Node;
use lora_abp_sender::status::oled::OledDisplay;
use lora_abp_sender::status::StatusPanel;

type Radio = Sx1262Driver<
    Spi<'static, Async>,
    Output<'static>,
    Input<'static>,
    Output<'static>,
    Input<'static>,
>;

type Display = OledDisplay<I2CInterface<I2c<'static, Blocking>>>;

type SenderNode = Node<LoraWanEngine<Radio, EmbassyClock>, Display, Output<'static>>;

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

#[esp_hal::main]
fn main() -> ! {
    debug::init(LevelFilter::Debug);
    info!("LoraWAN Node... (console {} baud)", serial::BAUD_RATE);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Sending LED, off until the first packet is queued
    let led = Output::new(peripherals.GPIO35, Level::Low, OutputConfig::default());

    // Vext powers the OLED (active low)
    let vext = Output::new(peripherals.GPIO36, Level::Low, OutputConfig::default());
    core::mem::forget(vext);

    // OLED reset pulse
    let mut oled_rst = Output::new(peripherals.GPIO21, Level::High, OutputConfig::default());
    let delay = Delay::new();
    oled_rst.set_low();
    delay.delay_millis(oled::RESET_PULSE_MS);
    oled_rst.set_high();
    core::mem::forget(oled_rst);

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // OLED on I2C
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_sda(peripherals.GPIO17)
    .with_scl(peripherals.GPIO18);

    let display = OledDisplay::new(I2CDisplayInterface::new(i2c))
        .expect("Failed to initialise OLED");

    // Configure SPI for LoRa
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(1))
            .with_mode(SpiMode::_0),
    )
    .unwrap()
    .with_sck(peripherals.GPIO9)
    .with_miso(peripherals.GPIO11)
    .with_mosi(peripherals.GPIO10)
    .into_async();

    // Configure LoRa control pins
    let nss = Output::new(peripherals.GPIO8, Level::High, OutputConfig::default());
    let dio1 = Input::new(peripherals.GPIO14, InputConfig::default().with_pull(Pull::Down));
    let nrst = Output::new(peripherals.GPIO12, Level::High, OutputConfig::default());
    let busy = Input::new(peripherals.GPIO13, InputConfig::default().with_pull(Pull::Down));

    let lora_pins = Sx1262Pins {
        nss,
        dio1,
        nrst,
        busy,
    };

    let radio = Sx1262Driver::new(spi, lora_pins);
    let engine = LoraWanEngine::new(radio, EmbassyClock);
    let node = Node::new(engine, StatusPanel::new(display, led));

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(node_task(node));
    })
}

/// Splash screens, bootstrap, then the run-loop forever
#[embassy_executor::task]
async fn node_task(mut node: SenderNode) {
    node.status_mut().show_logo();
    embassy_time::Timer::after_millis(oled::SPLASH_MS).await;
    node.status_mut().show_banner();
    embassy_time::Timer::after_millis(oled::SPLASH_MS).await;

    if let Err(err) = node.bootstrap().await {
        error!("Bootstrap failed: {:?}", err);
    }

    node.run().await
}
