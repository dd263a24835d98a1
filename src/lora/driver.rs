//! SX1262 LoRa driver
//!
//! Raw SPI commands behind the LoraRadio trait. The radio idles in standby
//! between operations and every receive is a single-shot window.

use crate::config::protocol::MAX_LORA_PAYLOAD;
use crate::config::tcxo;
use crate::lora::sx1262::{self, cmd, irq, reg};
use crate::lora::traits::{LoraConfig, LoraError, LoraRadio, RxPacket};
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::spi::SpiBus;
use heapless::Vec;
use log::{debug, trace};

/// TX and RX halves of the 256-byte data buffer
const TX_BASE: u8 = 0x00;
const RX_BASE: u8 = 0x80;

const CURRENT_LIMIT_MA: u16 = 140;
const TCXO_STARTUP_MS: u32 = 5;

/// Longest command argument list (SetDioIrqParams)
const MAX_ARGS: usize = 8;

/// Control pins for SX1262
pub struct Sx1262Pins<Nss, Dio1, Nrst, Busy> {
    pub nss: Nss,
    pub dio1: Dio1,
    pub nrst: Nrst,
    pub busy: Busy,
}

/// SX1262 LoRa driver
///
/// SPI bus with manual NSS. `configure` applies frequency, modulation and
/// power; packet parameters are written per operation from the stored
/// configuration.
pub struct Sx1262Driver<Spi, Nss, Dio1, Nrst, Busy>
where
    Spi: SpiBus,
    Nss: OutputPin,
    Dio1: InputPin,
    Nrst: OutputPin,
    Busy: InputPin,
{
    spi: Spi,
    nss: Nss,
    dio1: Dio1,
    nrst: Nrst,
    busy: Busy,
    initialised: bool,
    config: LoraConfig,
}

impl<Spi, Nss, Dio1, Nrst, Busy> Sx1262Driver<Spi, Nss, Dio1, Nrst, Busy>
where
    Spi: SpiBus,
    Nss: OutputPin,
    Dio1: InputPin,
    Nrst: OutputPin,
    Busy: InputPin,
{
    pub fn new(spi: Spi, pins: Sx1262Pins<Nss, Dio1, Nrst, Busy>) -> Self {
        Self {
            spi,
            nss: pins.nss,
            dio1: pins.dio1,
            nrst: pins.nrst,
            busy: pins.busy,
            initialised: false,
            config: LoraConfig::default(),
        }
    }

    async fn reset(&mut self) {
        let _ = self.nrst.set_low();
        Timer::after(Duration::from_millis(10)).await;
        let _ = self.nrst.set_high();
        Timer::after(Duration::from_millis(20)).await;
    }

    /// BUSY stays high while the radio processes the previous command
    async fn wait_not_busy(&mut self) -> Result<(), LoraError> {
        for _ in 0..1000 {
            if self.busy.is_low().unwrap_or(false) {
                return Ok(());
            }
            Timer::after(Duration::from_micros(100)).await;
        }
        Err(LoraError::BusyTimeout)
    }

    /// One NSS-framed transfer. `rx` may be empty for write-only commands.
    async fn transaction(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), LoraError> {
        self.wait_not_busy().await?;

        let _ = self.nss.set_low();
        let result = if rx.is_empty() {
            self.spi.write(tx).await
        } else {
            self.spi.transfer(rx, tx).await
        };
        let _ = self.nss.set_high();

        result.map_err(|_| LoraError::SpiError)
    }

    async fn command(&mut self, opcode: u8, args: &[u8]) -> Result<(), LoraError> {
        let mut frame: Vec<u8, { MAX_ARGS + 1 }> = Vec::new();
        frame.push(opcode).map_err(|_| LoraError::InvalidConfig)?;
        frame
            .extend_from_slice(args)
            .map_err(|_| LoraError::InvalidConfig)?;
        self.transaction(&frame, &mut []).await
    }

    /// Opcode, status NOP, then `N` response bytes
    async fn query<const N: usize>(&mut self, opcode: u8) -> Result<[u8; N], LoraError> {
        let mut tx = [0u8; 6];
        let mut rx = [0u8; 6];
        tx[0] = opcode;
        self.transaction(&tx[..2 + N], &mut rx[..2 + N]).await?;

        let mut response = [0u8; N];
        response.copy_from_slice(&rx[2..2 + N]);
        Ok(response)
    }

    async fn write_registers(&mut self, addr: u16, values: &[u8]) -> Result<(), LoraError> {
        let [hi, lo] = addr.to_be_bytes();
        let mut args: Vec<u8, MAX_ARGS> = Vec::from_slice(&[hi, lo]).map_err(|_| LoraError::InvalidConfig)?;
        args.extend_from_slice(values)
            .map_err(|_| LoraError::InvalidConfig)?;
        self.command(cmd::WRITE_REGISTER, &args).await
    }

    async fn read_register(&mut self, addr: u16) -> Result<u8, LoraError> {
        let [hi, lo] = addr.to_be_bytes();
        let tx = [cmd::READ_REGISTER, hi, lo, 0x00, 0x00];
        let mut rx = [0u8; 5];
        self.transaction(&tx, &mut rx).await?;
        Ok(rx[4])
    }

    async fn standby(&mut self) -> Result<(), LoraError> {
        self.command(cmd::SET_STANDBY, &[sx1262::STANDBY_RC]).await
    }

    /// Packet parameters plus the IQ polarity workaround that goes with them
    async fn apply_packet_params(&mut self, payload_len: u8) -> Result<(), LoraError> {
        let params = sx1262::packet_params(&self.config, payload_len);
        self.command(cmd::SET_PACKET_PARAMS, &params).await?;

        let current = self.read_register(reg::IQ_POLARITY).await?;
        let fixed = sx1262::iq_polarity(current, self.config.invert_iq);
        self.write_registers(reg::IQ_POLARITY, &[fixed]).await
    }

    async fn arm_irq(&mut self, mask: u16) -> Result<(), LoraError> {
        self.command(cmd::SET_DIO_IRQ_PARAMS, &sx1262::irq_params(mask))
            .await?;
        self.clear_irq().await
    }

    async fn clear_irq(&mut self) -> Result<(), LoraError> {
        self.command(cmd::CLEAR_IRQ_STATUS, &irq::ALL.to_be_bytes())
            .await
    }

    /// Poll DIO1 until it rises, then read the IRQ status
    async fn wait_for_irq(&mut self, timeout_ms: u32) -> Result<u16, LoraError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);

        loop {
            if self.dio1.is_high().unwrap_or(false) {
                let status = self.query::<2>(cmd::GET_IRQ_STATUS).await?;
                return Ok(u16::from_be_bytes(status));
            }
            if Instant::now() >= deadline {
                return Err(LoraError::Timeout);
            }
            Timer::after(Duration::from_micros(100)).await;
        }
    }

    async fn write_buffer(&mut self, data: &[u8]) -> Result<(), LoraError> {
        let mut frame: Vec<u8, { MAX_LORA_PAYLOAD + 2 }> = Vec::new();
        let _ = frame.extend_from_slice(&[cmd::WRITE_BUFFER, TX_BASE]);
        frame
            .extend_from_slice(data)
            .map_err(|_| LoraError::InvalidConfig)?;
        self.transaction(&frame, &mut []).await
    }

    async fn read_buffer(&mut self, offset: u8, len: usize) -> Result<Vec<u8, MAX_LORA_PAYLOAD>, LoraError> {
        let len = len.min(MAX_LORA_PAYLOAD);
        let mut tx = [0u8; MAX_LORA_PAYLOAD + 3];
        let mut rx = [0u8; MAX_LORA_PAYLOAD + 3];
        tx[0] = cmd::READ_BUFFER;
        tx[1] = offset;
        self.transaction(&tx[..3 + len], &mut rx[..3 + len]).await?;

        Vec::from_slice(&rx[3..3 + len]).map_err(|_| LoraError::ReceiveFailed)
    }
}

impl<Spi, Nss, Dio1, Nrst, Busy> LoraRadio for Sx1262Driver<Spi, Nss, Dio1, Nrst, Busy>
where
    Spi: SpiBus,
    Nss: OutputPin,
    Dio1: InputPin,
    Nrst: OutputPin,
    Busy: InputPin,
{
    async fn init(&mut self) -> Result<(), LoraError> {
        self.reset().await;
        self.standby().await?;

        let tcxo = sx1262::tcxo_params(tcxo::VOLTAGE_CODE, TCXO_STARTUP_MS);
        self.command(cmd::SET_DIO3_AS_TCXO_CTRL, &tcxo).await?;
        Timer::after(Duration::from_millis(10)).await;

        self.command(cmd::SET_DIO2_AS_RF_SWITCH_CTRL, &[0x01]).await?;
        self.write_registers(reg::OCP_CONFIGURATION, &[sx1262::current_limit(CURRENT_LIMIT_MA)])
            .await?;
        self.command(cmd::SET_PACKET_TYPE, &[sx1262::PACKET_TYPE_LORA])
            .await?;
        self.command(cmd::SET_BUFFER_BASE_ADDRESS, &[TX_BASE, RX_BASE])
            .await?;
        self.command(cmd::SET_PA_CONFIG, &sx1262::PA_CONFIG).await?;

        let config = self.config.clone();
        self.configure(&config).await?;

        self.initialised = true;
        debug!("SX1262 ready");
        Ok(())
    }

    async fn transmit(&mut self, data: &[u8]) -> Result<(), LoraError> {
        if !self.initialised {
            return Err(LoraError::NotInitialised);
        }
        if data.is_empty() || data.len() > MAX_LORA_PAYLOAD {
            return Err(LoraError::InvalidConfig);
        }

        self.standby().await?;
        self.apply_packet_params(data.len() as u8).await?;
        self.write_buffer(data).await?;
        self.arm_irq(irq::TX_DONE).await?;

        // No radio-side timeout, bounded below by the time on air
        self.command(cmd::SET_TX, &[0x00, 0x00, 0x00]).await?;
        let status = self
            .wait_for_irq(sx1262::tx_timeout_ms(&self.config, data.len()))
            .await?;

        self.clear_irq().await?;
        self.standby().await?;
        trace!("TX done, IRQ {:#06x}", status);

        if status & irq::TX_DONE != 0 {
            Ok(())
        } else {
            Err(LoraError::TransmitFailed)
        }
    }

    async fn receive(&mut self, timeout_ms: u32) -> Result<RxPacket, LoraError> {
        if !self.initialised {
            return Err(LoraError::NotInitialised);
        }

        self.standby().await?;
        self.apply_packet_params(MAX_LORA_PAYLOAD as u8).await?;
        self.arm_irq(irq::RX_DONE | irq::TIMEOUT | irq::CRC_ERR)
            .await?;

        self.command(cmd::SET_RX, &sx1262::rx_timeout(timeout_ms))
            .await?;
        let status = self.wait_for_irq(timeout_ms + 1000).await?;
        self.clear_irq().await?;

        if status & irq::TIMEOUT != 0 {
            return Err(LoraError::Timeout);
        }
        if status & irq::CRC_ERR != 0 {
            return Err(LoraError::CrcError);
        }
        if status & irq::RX_DONE == 0 {
            return Err(LoraError::ReceiveFailed);
        }

        let [len, offset] = self.query::<2>(cmd::GET_RX_BUFFER_STATUS).await?;
        let data = self.read_buffer(offset, len as usize).await?;
        let [rssi_raw, snr_raw, _] = self.query::<3>(cmd::GET_PACKET_STATUS).await?;
        let (rssi, snr) = sx1262::packet_status(rssi_raw, snr_raw);
        trace!("RX {} bytes, RSSI {} SNR {}", data.len(), rssi, snr);

        Ok(RxPacket { data, rssi, snr })
    }

    async fn configure(&mut self, config: &LoraConfig) -> Result<(), LoraError> {
        let modulation = sx1262::modulation_params(config)?;

        self.standby().await?;
        self.command(cmd::SET_RF_FREQUENCY, &sx1262::frequency_word(config.frequency_hz))
            .await?;
        self.command(cmd::SET_MODULATION_PARAMS, &modulation)
            .await?;
        self.command(cmd::SET_TX_PARAMS, &sx1262::tx_params(config.tx_power_dbm))
            .await?;
        self.write_registers(reg::LORA_SYNC_WORD, &sx1262::sync_word(config.public_network))
            .await?;

        self.config = config.clone();
        Ok(())
    }

    async fn set_standby(&mut self) -> Result<(), LoraError> {
        self.standby().await
    }
}
