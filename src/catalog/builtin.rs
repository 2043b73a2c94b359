//! Default catalog: a PHP/LAMP developer workstation on a Debian-family system.

use super::{Catalog, CatalogBuilder};
use crate::error::Result;
use crate::install_module::{HookCommand, InstallModule};
use crate::strategies::{
    BinaryInstall, CMakeBuild, ConfigureOption, DownloadInstall, PackageManagerInstall, PhpBuild,
    SourceBuild, SourceInstall,
};

const PHP_EXTENSION_DIR: &str = "/usr/lib/php5/20121212";

fn package(name: &str, install_by_default: bool) -> InstallModule {
    InstallModule {
        install_by_default,
        ..InstallModule::new(name, PackageManagerInstall::new(name))
    }
}

fn librabbitmq_post_install() -> Vec<HookCommand> {
    ["librabbitmq.so", "librabbitmq.so.1", "librabbitmq.so.1.2.0"]
        .iter()
        .map(|lib| {
            let from = format!("librabbitmq/{}", lib);
            let to = format!("{}/{}", PHP_EXTENSION_DIR, lib);
            HookCommand::elevated("mv", &[from.as_str(), to.as_str()])
        })
        .collect()
}

/// The catalog shipped with the binary.
pub fn builtin_catalog() -> Result<Catalog> {
    let mut b = CatalogBuilder::new();

    // Shared prerequisites
    let php5_dev = b.add_module(package("php5-dev", true));
    let cmake = b.add_module(package("cmake", true));
    let librabbitmq = b.add_module_with_prereqs(
        InstallModule {
            install_by_default: true,
            ..InstallModule::new(
                "librabbitmq",
                SourceInstall::new(
                    "https://github.com/alanxz/rabbitmq-c/archive/master.zip",
                    "/usr/local/lib/librabbitmq.so",
                    "rabbitmq-c-master",
                    SourceBuild::CMake(CMakeBuild {
                        post_install: librabbitmq_post_install(),
                        ..CMakeBuild::default()
                    }),
                ),
            )
        },
        &[cmake],
    );
    let php5 = b.add_module(package("php5", true));
    let php5_json = b.add_module(package("php5-json", true));
    let apache = b.add_module(package("apache2", true));
    let jre = b.add_module(package("openjdk-7-jre", true));

    let chromium = b.add_module(package("chromium-browser", true));
    let firefox = b.add_module(package("firefox", true));
    b.add_category("Browsers", vec![("Chromium", chromium), ("Firefox", firefox)]);

    let gftp = b.add_module(package("gftp", false));
    let filezilla = b.add_module(package("filezilla", true));
    b.add_category("FTP Clients", vec![("gFTP", gftp), ("Filezilla", filezilla)]);

    let git = b.add_module(package("git", true));
    let mercurial = b.add_module(InstallModule {
        install_by_default: true,
        ..InstallModule::new("mercurial", PackageManagerInstall::with_command("mercurial", "hg"))
    });
    b.add_category("Source Control Clients", vec![("Git", git), ("Mercurial", mercurial)]);

    b.add_category("Servers", vec![("Apache", apache)]);

    let rabbitmq = b.add_module(InstallModule {
        post_install: vec![HookCommand::elevated(
            "rabbitmq-plugins",
            &["enable", "rabbitmq_management"],
        )],
        ..package("rabbitmq-server", true)
    });
    b.add_category("Message Queues", vec![("RabbitMQ", rabbitmq)]);

    let amqp = b.add_module_with_prereqs(
        InstallModule {
            install_by_default: true,
            ..InstallModule::new(
                "php5-amqp",
                SourceInstall::new(
                    "http://pecl.php.net/get/amqp-1.0.10.tgz",
                    format!("{}/amqp.so", PHP_EXTENSION_DIR),
                    "amqp-1.0.10",
                    SourceBuild::Php(PhpBuild {
                        configure_options: vec![ConfigureOption::new("with", "amqp")],
                    }),
                ),
            )
        },
        &[php5_dev, librabbitmq, php5],
    );
    let composer = b.add_module_with_prereqs(
        InstallModule {
            install_by_default: true,
            ..InstallModule::new(
                "composer",
                BinaryInstall::new("https://getcomposer.org/download/1.0.0-alpha8/composer.phar"),
            )
        },
        &[php5_json],
    );
    let mcrypt = b.add_module_with_prereqs(
        InstallModule {
            post_install: vec![
                HookCommand::elevated(
                    "ln",
                    &["-s", "/etc/php5/conf.d/mcrypt.ini", "/etc/php5/mods-available/mcrypt.ini"],
                ),
                HookCommand::elevated("php5enmod", &["mcrypt"]),
            ],
            ..package("php5-mcrypt", true)
        },
        &[apache],
    );
    let netbeans = b.add_module_with_prereqs(
        InstallModule {
            install_by_default: true,
            ..InstallModule::new(
                "netbeans-php",
                DownloadInstall::new(
                    "http://download.netbeans.org/netbeans/8.0/final/bundles/netbeans-8.0-php-linux.sh",
                    "/usr/local/netbeans-8.0",
                ),
            )
        },
        &[jre],
    );
    b.add_category(
        "PHP",
        vec![
            ("PHP", php5),
            ("PHP-amqp", amqp),
            ("Composer", composer),
            ("PHP5-Mcrypt", mcrypt),
            ("Netbeans-PHP", netbeans),
        ],
    );

    let mysql_server = b.add_module(package("mysql-server", true));
    let phpmyadmin = b.add_module(package("phpmyadmin", true));
    let workbench = b.add_module(package("mysql-workbench", true));
    b.add_category(
        "Databases and Clients",
        vec![
            ("MySQL Server", mysql_server),
            ("PHPMyAdmin", phpmyadmin),
            ("MySQL Workbench", workbench),
        ],
    );

    b.build()
}
