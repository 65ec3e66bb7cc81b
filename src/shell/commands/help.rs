use crate::println;

pub fn run(_args: &str) {
    println!("ContinuumOS shell - available commands:");
    println!();
    println!("  help                Show this help message");
    println!("  ls [dir]            List directory contents");
    println!("  cd <dir>            Change working directory");
    println!("  cat <file>          Print a file's contents");
    println!("  touch <file>        Create an empty file");
    println!("  mkdir <dir>         Create a directory");
    println!("  rm <file>           Remove a file");
    println!("  rmdir <dir>         Remove an empty directory");
    println!("  echo <text>         Print text");
    println!("  pwd                 Print working directory");
    println!("  uptime              Time since boot");
    println!("  history             Show command history");
    println!("  edit <file>         Open the line editor");
    println!("  lsblk               List block devices");
    println!("  disktest            Exercise the ATA driver");
    println!("  mount <dev> <path>  Mount FAT32 at path");
    println!("  umount <path>       Unmount a filesystem");
    println!("  fsinfo              Filesystem summary");
    println!("  meminfo             Heap usage summary");
    println!("  free                Short memory summary");
    println!("  lspci               List PCI devices");
}
