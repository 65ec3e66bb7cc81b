//! PCI configuration-space enumeration and per-process device listeners
//! (§4.10, §6 "PCI configuration space").

use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::instructions::port::Port;

use crate::config::{MAX_PCI_DEVICES, MAX_PCI_LISTENERS};
use crate::process::event::{Event, PciEventKind};
use crate::process::task::Pid;

const CONFIG_ADDRESS: u16 = 0xCF8;
const CONFIG_DATA: u16 = 0xCFC;

const REG_VENDOR_ID: u8 = 0x00;
const REG_DEVICE_ID: u8 = 0x02;
const REG_CLASS: u8 = 0x0B;
const REG_SUBCLASS: u8 = 0x0A;
const REG_HEADER_TYPE: u8 = 0x0E;

const WILDCARD: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy)]
pub struct PciDevice {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
    pub vendor_id: u16,
    pub device_id: u16,
    pub class_code: u8,
    pub subclass: u8,
}

struct Listener {
    pid: Pid,
    vendor_id: u16,
    device_id: u16,
}

fn config_address(bus: u8, device: u8, function: u8, offset: u8) -> u32 {
    (1 << 31)
        | (bus as u32) << 16
        | (device as u32) << 11
        | (function as u32) << 8
        | (offset & 0xFC) as u32
}

fn read_config_dword(bus: u8, device: u8, function: u8, offset: u8) -> u32 {
    let mut addr_port: Port<u32> = Port::new(CONFIG_ADDRESS);
    let mut data_port: Port<u32> = Port::new(CONFIG_DATA);
    unsafe {
        addr_port.write(config_address(bus, device, function, offset));
        data_port.read()
    }
}

fn read_config_word(bus: u8, device: u8, function: u8, offset: u8) -> u16 {
    let dword = read_config_dword(bus, device, function, offset & 0xFC);
    ((dword >> ((offset & 2) * 8)) & 0xFFFF) as u16
}

fn read_config_byte(bus: u8, device: u8, function: u8, offset: u8) -> u8 {
    let dword = read_config_dword(bus, device, function, offset & 0xFC);
    ((dword >> ((offset & 3) * 8)) & 0xFF) as u8
}

fn device_exists(bus: u8, device: u8, function: u8) -> bool {
    read_config_word(bus, device, function, REG_VENDOR_ID) != WILDCARD
}

fn read_device_info(bus: u8, device: u8, function: u8) -> PciDevice {
    PciDevice {
        bus,
        device,
        function,
        vendor_id: read_config_word(bus, device, function, REG_VENDOR_ID),
        device_id: read_config_word(bus, device, function, REG_DEVICE_ID),
        class_code: read_config_byte(bus, device, function, REG_CLASS),
        subclass: read_config_byte(bus, device, function, REG_SUBCLASS),
    }
}

struct PciBus {
    devices: Vec<PciDevice>,
    listeners: Vec<Listener>,
}

impl PciBus {
    fn new() -> Self {
        PciBus { devices: Vec::new(), listeners: Vec::new() }
    }

    fn scan(&mut self) {
        self.devices.clear();
        'outer: for bus in 0u16..256 {
            let bus = bus as u8;
            for device in 0u8..32 {
                if !device_exists(bus, device, 0) {
                    continue;
                }
                let header_type = read_config_byte(bus, device, 0, REG_HEADER_TYPE);
                let max_functions = if header_type & 0x80 != 0 { 8 } else { 1 };
                for function in 0..max_functions {
                    if !device_exists(bus, device, function) {
                        continue;
                    }
                    if self.devices.len() >= MAX_PCI_DEVICES {
                        crate::log_warn!("PCI: device table full at {} entries.", MAX_PCI_DEVICES);
                        break 'outer;
                    }
                    self.devices.push(read_device_info(bus, device, function));
                }
            }
        }
    }

    fn matches(listener_vendor: u16, listener_device: u16, dev: &PciDevice) -> bool {
        (listener_vendor == WILDCARD || dev.vendor_id == listener_vendor)
            && (listener_device == WILDCARD || dev.device_id == listener_device)
    }

    fn register_listener(&mut self, pid: Pid, vendor_id: u16, device_id: u16) -> Vec<Event> {
        if let Some(l) = self.listeners.iter_mut().find(|l| l.pid == pid) {
            l.vendor_id = vendor_id;
            l.device_id = device_id;
        } else if self.listeners.len() < MAX_PCI_LISTENERS {
            self.listeners.push(Listener { pid, vendor_id, device_id });
        } else {
            crate::log_warn!("PCI: listener table full, pid {} not registered.", pid);
            return Vec::new();
        }

        self.devices
            .iter()
            .filter(|d| Self::matches(vendor_id, device_id, d))
            .map(|d| pci_event(d, PciEventKind::DeviceAdded))
            .collect()
    }

    fn unregister_listener(&mut self, pid: Pid) {
        self.listeners.retain(|l| l.pid != pid);
    }
}

fn pci_event(dev: &PciDevice, kind: PciEventKind) -> Event {
    Event::Pci {
        bus: dev.bus,
        device: dev.device,
        function: dev.function,
        vendor: dev.vendor_id,
        device_id: dev.device_id,
        class: dev.class_code,
        subclass: dev.subclass,
        kind,
    }
}

use alloc::vec::Vec;

lazy_static! {
    static ref PCI: Mutex<PciBus> = Mutex::new(PciBus::new());
}

pub fn init() {
    let mut bus = PCI.lock();
    bus.scan();
    crate::log_info!("PCI: found {} device(s).", bus.devices.len());
}

pub fn device_count() -> usize {
    PCI.lock().devices.len()
}

pub fn devices() -> Vec<PciDevice> {
    PCI.lock().devices.clone()
}

impl Clone for PciDevice {
    fn clone(&self) -> Self {
        *self
    }
}

/// Register `pid` for `DeviceAdded` events on devices matching
/// `(vendor_id, device_id)` (`0xFFFF` = wildcard), delivering events for
/// any already-enumerated matches immediately.
pub fn register_listener(pid: Pid, vendor_id: u16, device_id: u16) {
    let events = PCI.lock().register_listener(pid, vendor_id, device_id);
    if !events.is_empty() {
        let mut sched = crate::process::SCHEDULER.lock();
        for event in events {
            let _ = sched.deliver_to(pid, event);
        }
    }
}

pub fn unregister_listener(pid: Pid) {
    PCI.lock().unregister_listener(pid);
}
